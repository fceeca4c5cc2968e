//! Service instances, registrations and the registry backend trait

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One running, network-addressable copy of a logical service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Service ID (unique per instance)
    pub service_id: String,

    /// Logical service name
    pub service_name: String,

    /// Host/IP address
    pub address: String,

    /// Port number
    pub port: u16,

    /// Service tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Metadata
    #[serde(default)]
    pub meta: HashMap<String, String>,

    /// Result of the last direct health probe; `true` until probed
    #[serde(default = "default_healthy")]
    pub healthy: bool,

    /// When the instance was last probed
    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,
}

fn default_healthy() -> bool {
    true
}

impl ServiceInstance {
    /// Create new service instance
    pub fn new(
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            address: address.into(),
            port,
            tags: Vec::new(),
            meta: HashMap::new(),
            healthy: true,
            last_check_time: None,
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add metadata
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Base URL of the instance
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// URL of the instance's `/health` endpoint
    pub fn health_url(&self) -> String {
        format!("{}/health", self.url())
    }
}

/// HTTP health check attached to a registration.
///
/// Serialized in the registry's field naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckSpec {
    #[serde(rename = "HTTP")]
    pub http: String,
    pub interval: String,
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deregister_critical_service_after: Option<String>,
}

impl HealthCheckSpec {
    /// Check `url` every 10s with a 5s timeout
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            http: url.into(),
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            deregister_critical_service_after: None,
        }
    }

    /// The check used when a registration doesn't supply one: `GET /health`
    /// on the instance, deregistered after one minute critical
    pub fn default_for(address: &str, port: u16) -> Self {
        Self::http(format!("http://{}:{}/health", address, port)).deregister_after("1m")
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn deregister_after(mut self, after: impl Into<String>) -> Self {
        self.deregister_critical_service_after = Some(after.into());
        self
    }
}

/// Payload for registering an instance
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub id: Option<String>,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
    pub check: Option<HealthCheckSpec>,
}

impl Registration {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            id: None,
            address: address.into(),
            port,
            tags: Vec::new(),
            meta: HashMap::new(),
            check: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_check(mut self, check: HealthCheckSpec) -> Self {
        self.check = Some(check);
        self
    }

    /// Fill in a generated `{name}-{uuid}` id and the default health check
    /// where they are missing.
    pub fn resolved(mut self) -> Self {
        if self.id.as_deref().is_none_or(str::is_empty) {
            self.id = Some(format!("{}-{}", self.name, uuid::Uuid::new_v4()));
        }
        if self.check.is_none() {
            self.check = Some(HealthCheckSpec::default_for(&self.address, self.port));
        }
        self
    }

    /// The instance this registration describes, once an id is known
    pub fn to_instance(&self) -> Option<ServiceInstance> {
        let id = self.id.clone()?;
        let mut instance = ServiceInstance::new(id, &self.name, &self.address, self.port);
        instance.tags = self.tags.clone();
        instance.meta = self.meta.clone();
        Some(instance)
    }
}

/// Status reported by a registry health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    pub fn is_passing(self) -> bool {
        self == CheckStatus::Passing
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Passing => "passing",
            CheckStatus::Warning => "warning",
            CheckStatus::Critical => "critical",
            CheckStatus::Unknown => "unknown",
        }
    }
}

/// One health check result as reported by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(rename = "CheckID", default)]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    pub status: CheckStatus,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub output: String,
}

/// A service registry.
///
/// Implementations report failures as errors; the recovery policy lives in
/// [`DiscoveryClient`](crate::DiscoveryClient).
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Register an instance. The registration's id must be set.
    async fn register(&self, registration: &Registration) -> Result<()>;

    /// Remove an instance by id
    async fn deregister(&self, service_id: &str) -> Result<()>;

    /// Instances of `service_name` whose checks are all passing
    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;

    /// All service names with their tags
    async fn catalog_services(&self) -> Result<HashMap<String, Vec<String>>>;

    /// Checks registered for one instance
    async fn health_checks(&self, service_id: &str) -> Result<Vec<HealthCheck>>;
}
