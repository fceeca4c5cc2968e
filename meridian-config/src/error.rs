//! Errors raised while loading or resolving settings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key is absent from every layer
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    /// A config file could not be read or has an unknown format
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// A config file was read but is not valid TOML/JSON
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A key is present but its value has the wrong type
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Resolved settings violate a constraint
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to read .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ConfigError {
    /// Whether the error names a key that was simply absent, as opposed to
    /// present but unusable.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            ConfigError::KeyNotFound(_) | ConfigError::Env(std::env::VarError::NotPresent)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
