//! Error types for the Meridian CLI.

use meridian::ContextError;
use meridian_config::ConfigError;
use meridian_discovery::{DiscoveryError, ServiceClientError};
use meridian_http_client::HttpClientError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Service context could not be opened
    #[error("{0}")]
    Context(#[from] ContextError),

    /// Registry request failed
    #[error("Registry error: {0}")]
    Registry(#[from] DiscoveryError),

    /// Service-to-service call failed
    #[error("Call failed: {0}")]
    Call(#[from] ServiceClientError),

    /// Response could not be read
    #[error("Response error: {0}")]
    Response(#[from] HttpClientError),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be encoded
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// The command ran but reported a failure (rejected registration,
    /// unhealthy service, ...)
    #[error("{0}")]
    Failed(String),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// `2` is reserved for usage errors, which clap reports itself.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InvalidArgument(_) => 2,
            CliError::Failed(_) => 1,
            _ => 3,
        }
    }
}
