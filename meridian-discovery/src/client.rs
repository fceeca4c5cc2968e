//! Cached, failure-tolerant discovery client

use crate::cache::ServiceCache;
use crate::consul::ConsulRegistry;
use crate::error::Result;
use crate::service::{Registration, RegistryBackend, ServiceInstance};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Front end over a [`RegistryBackend`] with a per-service TTL cache.
///
/// No operation raises: registry failures are logged at error level and
/// mapped to `false` or an empty result.
#[derive(Clone)]
pub struct DiscoveryClient {
    backend: Arc<dyn RegistryBackend>,
    cache: Arc<ServiceCache>,
    closed: Arc<AtomicBool>,
}

impl DiscoveryClient {
    pub fn new(backend: Arc<dyn RegistryBackend>, cache_ttl: Duration) -> Self {
        Self::with_cache(backend, Arc::new(ServiceCache::new(cache_ttl)))
    }

    pub fn with_cache(backend: Arc<dyn RegistryBackend>, cache: Arc<ServiceCache>) -> Self {
        Self {
            backend,
            cache,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Client for a Consul agent at `http://{host}:{port}`
    pub fn consul(host: &str, port: u16, timeout: Duration, cache_ttl: Duration) -> Result<Self> {
        let registry = ConsulRegistry::from_host(host, port, timeout)?;
        Ok(Self::new(Arc::new(registry), cache_ttl))
    }

    pub fn cache(&self) -> &Arc<ServiceCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    fn is_closed(&self, operation: &str) -> bool {
        let closed = self.closed.load(Ordering::SeqCst);
        if closed {
            error!(operation, "Discovery client is closed");
        }
        closed
    }

    /// Register an instance. Returns whether the registry accepted it.
    pub async fn register(&self, registration: Registration) -> bool {
        self.register_with_id(registration).await.is_some()
    }

    /// Register an instance and return the id it was registered under.
    ///
    /// A missing id becomes `{name}-{uuid}`; a missing check becomes an HTTP
    /// check on the instance's `/health`.
    pub async fn register_with_id(&self, registration: Registration) -> Option<String> {
        if self.is_closed("register") {
            return None;
        }

        let registration = registration.resolved();
        let service_id = registration.id.clone().unwrap_or_default();

        match self.backend.register(&registration).await {
            Ok(()) => {
                info!(
                    service = %registration.name,
                    service_id = %service_id,
                    address = %registration.address,
                    port = registration.port,
                    "Service registered"
                );
                Some(service_id)
            }
            Err(e) => {
                error!(
                    service = %registration.name,
                    service_id = %service_id,
                    error = %e,
                    "Service registration failed"
                );
                None
            }
        }
    }

    /// Deregister an instance. On success the whole cache is cleared, since
    /// the owning service name of `service_id` is not known here.
    pub async fn deregister(&self, service_id: &str) -> bool {
        if self.is_closed("deregister") {
            return false;
        }

        match self.backend.deregister(service_id).await {
            Ok(()) => {
                self.cache.clear();
                info!(service_id, "Service deregistered");
                true
            }
            Err(e) => {
                error!(service_id, error = %e, "Service deregistration failed");
                false
            }
        }
    }

    /// Passing instances of `service_name`, served from cache while valid.
    ///
    /// On registry failure the result is empty and the cache is left as it
    /// was; an expired entry is never served.
    pub async fn discover(&self, service_name: &str) -> Vec<ServiceInstance> {
        if let Some(instances) = self.cache.get_valid(service_name) {
            debug!(service = service_name, count = instances.len(), "Discovery cache hit");
            return instances;
        }

        if self.is_closed("discover") {
            return Vec::new();
        }

        match self.backend.healthy_instances(service_name).await {
            Ok(instances) => {
                info!(
                    service = service_name,
                    count = instances.len(),
                    "Service discovered"
                );
                self.cache.put(service_name, instances.clone());
                instances
            }
            Err(e) => {
                error!(service = service_name, error = %e, "Service discovery failed");
                Vec::new()
            }
        }
    }

    /// All registered services with their tags
    pub async fn list_all_services(&self) -> HashMap<String, Vec<String>> {
        if self.is_closed("list_all_services") {
            return HashMap::new();
        }

        match self.backend.catalog_services().await {
            Ok(services) => services,
            Err(e) => {
                error!(error = %e, "Failed to list services");
                HashMap::new()
            }
        }
    }

    /// Whether every registry check for `service_id` is passing. An instance
    /// with no checks counts as healthy.
    pub async fn check_health(&self, service_id: &str) -> bool {
        if self.is_closed("check_health") {
            return false;
        }

        match self.backend.health_checks(service_id).await {
            Ok(checks) => checks.iter().all(|check| check.status.is_passing()),
            Err(e) => {
                error!(service_id, error = %e, "Registry health check failed");
                false
            }
        }
    }

    /// Drop the cached instances of one service
    pub fn invalidate(&self, service_name: &str) -> bool {
        self.cache.invalidate(service_name)
    }

    /// Clear the cache and refuse further registry calls
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cache.clear();
            debug!("Discovery client closed");
        }
    }
}
