//! Discovery and service-call error types.

use meridian_http_client::HttpClientError;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Service discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Deregistration failed: {0}")]
    DeregistrationFailed(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(e: serde_json::Error) -> Self {
        DiscoveryError::Decode(e.to_string())
    }
}

/// Errors raised when calling another service by name.
#[derive(Debug, Error)]
pub enum ServiceClientError {
    #[error("No available instances for service: {0}")]
    NoInstances(String),

    #[error(transparent)]
    Http(#[from] HttpClientError),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}
