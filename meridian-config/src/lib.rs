// Configuration management for Meridian services

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{
    DiscoverySettings, HttpClientSettings, LoggingSettings, ServiceSettings, Settings,
    SettingsBuilder,
};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "MERIDIAN";

/// Layered key/value configuration store.
///
/// Keys are dotted paths (`discovery.consul_host`). Later loads override
/// earlier ones.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<BTreeMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(BTreeMap::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(BTreeMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from .env file
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path)?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        tracing::debug!(path, ?format, "Loaded configuration file");
        Ok(())
    }

    /// Load configuration from file, detecting the format from its extension
    pub fn load_file_auto(&self, path: &str) -> Result<()> {
        let loader = ConfigLoader::auto(path)?;
        self.load_file(path, loader.format())
    }

    /// Merge a (possibly nested) JSON object into the store
    pub fn merge_value(&self, value: Value) {
        let mut config = self.config.write();
        for (key, value) in loader::flatten(value) {
            config.insert(key, value);
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;

        self.config.write().insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value
    ///
    /// String values (from the environment or `.env` files) are coerced to
    /// numbers and booleans when the requested type needs it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_opt(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Get a configuration value if present
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value = match self.config.read().get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };

        coerce(key, value).map(Some)
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get an integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Get a float value
    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Get a list of strings; a plain string is split on commas
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let value = match self.config.read().get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };

        match value {
            Value::String(s) => Ok(Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            other => coerce(key, other).map(Some),
        }
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    /// Get all configuration keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Merge configuration from another manager
    pub fn merge(&self, other: &ConfigManager) {
        let other_config = other.config.read().clone();
        let mut config = self.config.write();

        for (key, value) in other_config {
            config.insert(key, value);
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(first) => match value {
            Value::String(raw) => {
                serde_json::from_str(raw.trim()).map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: first.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: first.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("service.name", "gateway").unwrap();

        let value: String = manager.get("service.name").unwrap();
        assert_eq!(value, "gateway");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_has_key() {
        let manager = ConfigManager::new();
        manager.set("existing_key", "value").unwrap();

        assert!(manager.has("existing_key"));
        assert!(!manager.has("missing_key"));
    }

    #[test]
    fn test_string_values_are_coerced() {
        let manager = ConfigManager::new();
        manager.set("discovery.consul_port", "8600").unwrap();
        manager.set("debug", "true").unwrap();
        manager.set("discovery.consul_timeout_secs", " 2.5 ").unwrap();

        let port: u16 = manager.get("discovery.consul_port").unwrap();
        assert_eq!(port, 8600);
        assert!(manager.get_bool("debug").unwrap());
        assert_eq!(manager.get_float("discovery.consul_timeout_secs").unwrap(), 2.5);
        // Strings stay strings when a string is requested
        assert_eq!(manager.get_string("discovery.consul_port").unwrap(), "8600");
    }

    #[test]
    fn test_invalid_value_reports_key() {
        let manager = ConfigManager::new();
        manager.set("discovery.consul_port", "not-a-port").unwrap();

        let err = manager.get::<u16>("discovery.consul_port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "discovery.consul_port"));
    }

    #[test]
    fn test_get_list() {
        let manager = ConfigManager::new();
        manager.set("service.tags", "api, v1,,").unwrap();
        manager.set("other.tags", vec!["a", "b"]).unwrap();

        assert_eq!(
            manager.get_list("service.tags").unwrap(),
            Some(vec!["api".to_string(), "v1".to_string()])
        );
        assert_eq!(
            manager.get_list("other.tags").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(manager.get_list("missing").unwrap(), None);
    }

    #[test]
    fn test_merge_value_flattens() {
        let manager = ConfigManager::new();
        manager.merge_value(serde_json::json!({"discovery": {"consul_host": "consul"}}));

        assert_eq!(manager.get_string("discovery.consul_host").unwrap(), "consul");
        assert_eq!(manager.keys(), vec!["discovery.consul_host".to_string()]);
    }

    #[test]
    fn test_merge_overrides() {
        let base = ConfigManager::new();
        base.set("environment", "development").unwrap();
        base.set("debug", false).unwrap();

        let overrides = ConfigManager::new();
        overrides.set("environment", "production").unwrap();

        base.merge(&overrides);
        assert_eq!(base.get_string("environment").unwrap(), "production");
        assert!(!base.get_bool("debug").unwrap());
    }
}
