//! Consul registry backend

use crate::error::{DiscoveryError, Result};
use crate::service::{HealthCheck, HealthCheckSpec, Registration, RegistryBackend, ServiceInstance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Consul agent HTTP API client
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    base: url::Url,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulRegistration<'a> {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    name: &'a str,
    address: &'a str,
    port: u16,
    tags: &'a [String],
    meta: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<&'a HealthCheckSpec>,
}

#[derive(Deserialize)]
struct ConsulServiceEntry {
    #[serde(rename = "Service")]
    service: ConsulServiceDetail,
}

#[derive(Deserialize)]
struct ConsulServiceDetail {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Tags", default)]
    tags: Option<Vec<String>>,
    #[serde(rename = "Meta", default)]
    meta: Option<HashMap<String, String>>,
}

impl From<ConsulServiceDetail> for ServiceInstance {
    fn from(detail: ConsulServiceDetail) -> Self {
        let mut instance =
            ServiceInstance::new(detail.id, detail.service, detail.address, detail.port);
        instance.tags = detail.tags.unwrap_or_default();
        instance.meta = detail.meta.unwrap_or_default();
        instance
    }
}

impl ConsulRegistry {
    /// Create a client for the agent at `base_url` (e.g. `http://localhost:8500`)
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use meridian_discovery::ConsulRegistry;
    /// use std::time::Duration;
    ///
    /// let consul = ConsulRegistry::new("http://localhost:8500", Duration::from_secs(10))?;
    /// # Ok::<(), meridian_discovery::DiscoveryError>(())
    /// ```
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let base = url::Url::parse(&base_url).map_err(|e| {
            DiscoveryError::InvalidConfiguration(format!("invalid registry URL {}: {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "invalid registry URL {}: not a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            base,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client for `http://{host}:{port}`
    pub fn from_host(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        Self::new(format!("http://{}:{}", host, port), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API URL under `/v1`; each segment is percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DiscoveryError::InvalidConfiguration(format!(
                    "invalid registry URL {}: not a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(DiscoveryError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: url::Url) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let response = Self::expect_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RegistryBackend for ConsulRegistry {
    async fn register(&self, registration: &Registration) -> Result<()> {
        let payload = ConsulRegistration {
            id: registration.id.as_deref(),
            name: &registration.name,
            address: &registration.address,
            port: registration.port,
            tags: &registration.tags,
            meta: &registration.meta,
            check: registration.check.as_ref(),
        };

        let response = self
            .client
            .put(self.endpoint(&["agent", "service", "register"])?)
            .json(&payload)
            .send()
            .await?;

        match Self::expect_success(response).await {
            Ok(_) => Ok(()),
            Err(DiscoveryError::Status { status, body }) => Err(DiscoveryError::RegistrationFailed(
                format!("{} (status {})", body, status),
            )),
            Err(e) => Err(e),
        }
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let url = self.endpoint(&["agent", "service", "deregister", service_id])?;
        let response = self.client.put(url).send().await?;

        match Self::expect_success(response).await {
            Ok(_) => Ok(()),
            Err(DiscoveryError::Status { status, body }) => Err(
                DiscoveryError::DeregistrationFailed(format!("{} (status {})", body, status)),
            ),
            Err(e) => Err(e),
        }
    }

    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        let mut url = self.endpoint(&["health", "service", service_name])?;
        url.query_pairs_mut().append_pair("passing", "true");
        let entries: Vec<ConsulServiceEntry> = self.get_json(url).await?;

        let instances: Vec<ServiceInstance> =
            entries.into_iter().map(|e| e.service.into()).collect();

        debug!(
            service = service_name,
            count = instances.len(),
            "Fetched passing instances from Consul"
        );
        Ok(instances)
    }

    async fn catalog_services(&self) -> Result<HashMap<String, Vec<String>>> {
        self.get_json(self.endpoint(&["catalog", "services"])?).await
    }

    async fn health_checks(&self, service_id: &str) -> Result<Vec<HealthCheck>> {
        self.get_json(self.endpoint(&["health", "checks", service_id])?)
            .await
    }
}
