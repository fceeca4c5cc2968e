//! Errors raised while building or using a [`ServiceContext`](crate::ServiceContext).

use meridian_config::ConfigError;
use meridian_discovery::DiscoveryError;
use meridian_http_client::HttpClientError;
use meridian_log::LogError;
use thiserror::Error;

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Service context is not open")]
    NotOpen,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LogError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpClientError),

    #[error("Service registration failed: {0}")]
    Registration(String),
}
