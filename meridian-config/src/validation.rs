// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;
use std::time::Duration;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a number is within range
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::Validation(format!(
                "{} must be between {} and {} (got {})",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate that a float is strictly positive
    pub fn positive(value: f64, field: &str) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a positive number (got {})",
                field, value
            )));
        }
        Ok(())
    }

    /// Validate a timeout given in seconds: strictly positive and small
    /// enough to be a `Duration`.
    pub fn timeout_secs(value: f64, field: &str) -> Result<()> {
        Self::positive(value, field)?;
        Duration::try_from_secs_f64(value)
            .map(|_| ())
            .map_err(|_| ConfigError::Validation(format!("{} is too large (got {})", field, value)))
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            return Err(ConfigError::Validation(format!(
                "{} must be one of [{}] (got {})",
                field,
                allowed.join(", "),
                value
            )));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{} must be a valid URL",
                field
            )));
        }
        Ok(())
    }

    /// Validate port number
    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a valid port number",
                field
            )));
        }
        Ok(())
    }
}
