//! Typed settings for a Meridian service.
//!
//! Settings are resolved from a [`ConfigManager`] in layers: built-in defaults,
//! then configuration files, then `.env`, then `MERIDIAN_*` environment
//! variables.

use crate::{ConfigError, ConfigManager, ConfigValidator, FileFormat, Result, Validate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of the running service, used for self-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Address other services use to reach this one.
    pub advertise_address: String,
    pub api_version: String,
    pub tags: Vec<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "meridian-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            advertise_address: "localhost".to_string(),
            api_version: "1.0.0".to_string(),
            tags: Vec::new(),
        }
    }
}

/// Registry connection and service cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    pub consul_host: String,
    pub consul_port: u16,
    pub consul_timeout_secs: f64,
    pub service_cache_ttl_secs: u64,
    pub register_self: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            consul_host: "localhost".to_string(),
            consul_port: 8500,
            consul_timeout_secs: 10.0,
            service_cache_ttl_secs: 30,
            register_self: true,
        }
    }
}

impl DiscoverySettings {
    /// Base URL of the registry agent.
    pub fn consul_url(&self) -> String {
        format!("http://{}:{}", self.consul_host, self.consul_port)
    }

    pub fn consul_timeout(&self) -> Result<Duration> {
        secs_to_duration(self.consul_timeout_secs, "discovery.consul_timeout_secs")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.service_cache_ttl_secs)
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpClientSettings {
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_connections: usize,
    pub follow_redirects: bool,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            max_retries: 3,
            backoff_base_ms: 100,
            max_connections: 100,
            follow_redirects: true,
        }
    }
}

impl HttpClientSettings {
    pub fn timeout(&self) -> Result<Duration> {
        secs_to_duration(self.timeout_secs, "http_client.timeout_secs")
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Complete settings for a Meridian service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub environment: String,
    pub debug: bool,
    pub service: ServiceSettings,
    pub discovery: DiscoverySettings,
    pub http_client: HttpClientSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            debug: false,
            service: ServiceSettings::default(),
            discovery: DiscoverySettings::default(),
            http_client: HttpClientSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Builder for layered loading.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Resolve settings from a populated manager, falling back to defaults
    /// for keys that are absent.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let d = Settings::default();

        let tags = manager
            .get_list("service.tags")?
            .unwrap_or(d.service.tags);

        Ok(Self {
            environment: pick(manager, "environment", d.environment)?,
            debug: pick(manager, "debug", d.debug)?,
            service: ServiceSettings {
                name: pick(manager, "service.name", d.service.name)?,
                host: pick(manager, "service.host", d.service.host)?,
                port: pick(manager, "service.port", d.service.port)?,
                advertise_address: pick(
                    manager,
                    "service.advertise_address",
                    d.service.advertise_address,
                )?,
                api_version: pick(manager, "service.api_version", d.service.api_version)?,
                tags,
            },
            discovery: DiscoverySettings {
                consul_host: pick(manager, "discovery.consul_host", d.discovery.consul_host)?,
                consul_port: pick(manager, "discovery.consul_port", d.discovery.consul_port)?,
                consul_timeout_secs: pick(
                    manager,
                    "discovery.consul_timeout_secs",
                    d.discovery.consul_timeout_secs,
                )?,
                service_cache_ttl_secs: pick(
                    manager,
                    "discovery.service_cache_ttl_secs",
                    d.discovery.service_cache_ttl_secs,
                )?,
                register_self: pick(
                    manager,
                    "discovery.register_self",
                    d.discovery.register_self,
                )?,
            },
            http_client: HttpClientSettings {
                timeout_secs: pick(manager, "http_client.timeout_secs", d.http_client.timeout_secs)?,
                max_retries: pick(manager, "http_client.max_retries", d.http_client.max_retries)?,
                backoff_base_ms: pick(
                    manager,
                    "http_client.backoff_base_ms",
                    d.http_client.backoff_base_ms,
                )?,
                max_connections: pick(
                    manager,
                    "http_client.max_connections",
                    d.http_client.max_connections,
                )?,
                follow_redirects: pick(
                    manager,
                    "http_client.follow_redirects",
                    d.http_client.follow_redirects,
                )?,
            },
            logging: LoggingSettings {
                level: pick(manager, "logging.level", d.logging.level)?,
                format: pick(manager, "logging.format", d.logging.format)?,
            },
        })
    }
}

fn secs_to_duration(secs: f64, key: &str) -> Result<Duration> {
    ConfigValidator::timeout_secs(secs, key)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

// Present-but-malformed values are errors, not silent defaults.
fn pick<T: DeserializeOwned>(manager: &ConfigManager, key: &str, default: T) -> Result<T> {
    Ok(manager.get_opt(key)?.unwrap_or(default))
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.environment, "environment")?;

        ConfigValidator::not_empty(&self.service.name, "service.name")?;
        ConfigValidator::not_empty(&self.service.host, "service.host")?;
        ConfigValidator::is_port(self.service.port, "service.port")?;
        ConfigValidator::not_empty(&self.service.advertise_address, "service.advertise_address")?;

        ConfigValidator::not_empty(&self.discovery.consul_host, "discovery.consul_host")?;
        ConfigValidator::is_port(self.discovery.consul_port, "discovery.consul_port")?;
        ConfigValidator::timeout_secs(
            self.discovery.consul_timeout_secs,
            "discovery.consul_timeout_secs",
        )?;

        ConfigValidator::timeout_secs(self.http_client.timeout_secs, "http_client.timeout_secs")?;
        ConfigValidator::in_range(self.http_client.max_retries, 0, 10, "http_client.max_retries")?;
        ConfigValidator::in_range(
            self.http_client.max_connections,
            1,
            10_000,
            "http_client.max_connections",
        )?;

        ConfigValidator::one_of(
            &self.logging.format.to_lowercase().as_str(),
            &["pretty", "compact", "json"],
            "logging.format",
        )?;

        Ok(())
    }
}

/// Builder that layers configuration sources before resolving [`Settings`].
pub struct SettingsBuilder {
    manager: ConfigManager,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    config_files: Vec<(String, Option<FileFormat>)>,
    overrides: ConfigManager,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            manager: ConfigManager::with_prefix(crate::DEFAULT_ENV_PREFIX),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
            overrides: ConfigManager::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.manager = ConfigManager::with_prefix(prefix);
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load; the format is detected from the extension
    pub fn add_file(mut self, path: impl Into<String>) -> Self {
        self.config_files.push((path.into(), None));
        self
    }

    /// Add configuration file with an explicit format
    pub fn add_file_with_format(mut self, path: impl Into<String>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), Some(format)));
        self
    }

    /// Set a value that wins over every other source
    pub fn set<T: Serialize>(self, key: &str, value: T) -> Result<Self> {
        self.overrides.set(key, value)?;
        Ok(self)
    }

    /// Build the layered manager without resolving settings
    pub fn build_manager(self) -> Result<ConfigManager> {
        for (path, format) in &self.config_files {
            match format {
                Some(format) => self.manager.load_file(path, *format)?,
                None => self.manager.load_file_auto(path)?,
            }
        }

        // Process environment wins over .env, which dotenvy never overwrites
        if self.load_dotenv {
            self.manager.load_dotenv(self.dotenv_path.as_deref())?;
        } else if self.load_env {
            self.manager.load_env()?;
        }

        self.manager.merge(&self.overrides);
        Ok(self.manager)
    }

    /// Build and validate the settings
    pub fn build(self) -> Result<Settings> {
        let manager = self.build_manager()?;
        let settings = Settings::from_manager(&manager)?;
        if let Err(e) = settings.validate() {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e);
        }
        Ok(settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
