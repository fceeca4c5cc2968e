//! Direct `/health` probing of discovered services

use crate::client::DiscoveryClient;
use crate::error::{DiscoveryError, Result};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for a single health probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Disjoint healthy/unhealthy service name sets
#[derive(Debug, Default)]
struct HealthState {
    healthy: HashSet<String>,
    unhealthy: HashSet<String>,
}

impl HealthState {
    fn record(&mut self, service_name: &str, healthy: bool) {
        if healthy {
            self.unhealthy.remove(service_name);
            self.healthy.insert(service_name.to_string());
        } else {
            self.healthy.remove(service_name);
            self.unhealthy.insert(service_name.to_string());
        }
    }
}

/// Probes service instances directly and tracks per-service health.
///
/// Sweeps are not scheduled here; call
/// [`check_all_services`](Self::check_all_services) from a timer.
pub struct HealthChecker {
    discovery: DiscoveryClient,
    client: reqwest::Client,
    state: Mutex<HealthState>,
    closed: AtomicBool,
}

impl HealthChecker {
    pub fn new(discovery: DiscoveryClient) -> Result<Self> {
        Self::with_timeout(discovery, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(discovery: DiscoveryClient, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            discovery,
            client,
            state: Mutex::new(HealthState::default()),
            closed: AtomicBool::new(false),
        })
    }

    /// GET the endpoint and report whether it answered exactly 200.
    ///
    /// A bare host URL (empty or `/` path) is probed at `/health`.
    pub async fn check_endpoint(&self, endpoint: &str) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            warn!(endpoint, "Health checker is closed");
            return false;
        }

        let mut url = match url::Url::parse(endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!(endpoint, error = %e, "Health check failed: invalid URL");
                return false;
            }
        };
        if url.path().is_empty() || url.path() == "/" {
            url.set_path("/health");
        }

        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                let healthy = response.status() == reqwest::StatusCode::OK;
                if !healthy {
                    debug!(url = %url, status = %response.status(), "Health check returned non-200");
                }
                healthy
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }

    /// Probe the first discovered instance of every registered service.
    ///
    /// Services with no passing instances are recorded unhealthy. The probed
    /// cached instance has its health flag and check time updated.
    pub async fn check_all_services(&self) -> HashMap<String, bool> {
        let services = self.discovery.list_all_services().await;

        let probes = services.keys().map(|name| async move {
            let instances = self.discovery.discover(name).await;
            let healthy = match instances.first() {
                Some(instance) => {
                    let healthy = self.check_endpoint(&instance.health_url()).await;
                    self.discovery
                        .cache()
                        .mark_health(name, &instance.service_id, healthy);
                    healthy
                }
                None => false,
            };
            self.state.lock().record(name, healthy);
            (name.clone(), healthy)
        });

        let results: HashMap<String, bool> = join_all(probes).await.into_iter().collect();

        debug!(
            services = results.len(),
            unhealthy = results.values().filter(|h| !**h).count(),
            "Health sweep finished"
        );
        results
    }

    /// Whether the last sweep found `service_name` healthy
    pub fn is_healthy(&self, service_name: &str) -> bool {
        self.state.lock().healthy.contains(service_name)
    }

    pub fn healthy_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().healthy.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn unhealthy_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().unhealthy.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Health checker closed");
        }
    }
}
