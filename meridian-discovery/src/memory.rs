//! In-memory registry (for testing and local development)

use crate::error::{DiscoveryError, Result};
use crate::service::{CheckStatus, HealthCheck, Registration, RegistryBackend, ServiceInstance};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct Entry {
    instance: ServiceInstance,
    has_check: bool,
    status: CheckStatus,
}

/// Process-local registry.
///
/// Instances start out passing; use [`set_check_status`](Self::set_check_status)
/// to simulate failing checks and [`set_available`](Self::set_available) to
/// simulate an unreachable registry.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    services: Arc<RwLock<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
    instance_queries: Arc<AtomicUsize>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the check status of a registered instance. Returns `false` if the
    /// id is unknown.
    pub fn set_check_status(&self, service_id: &str, status: CheckStatus) -> bool {
        match self.services.write().get_mut(service_id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// When unavailable, every operation fails as an unreachable agent would
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `healthy_instances` queries served so far
    pub fn instance_queries(&self) -> usize {
        self.instance_queries.load(Ordering::SeqCst)
    }

    /// Number of registered instances
    pub fn count(&self) -> usize {
        self.services.read().len()
    }

    pub fn clear(&self) {
        self.services.write().clear();
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DiscoveryError::Status {
                status: 503,
                body: "registry unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn register(&self, registration: &Registration) -> Result<()> {
        self.ensure_available()?;
        let instance = registration.to_instance().ok_or_else(|| {
            DiscoveryError::RegistrationFailed(format!(
                "registration for {} has no id",
                registration.name
            ))
        })?;

        self.services.write().insert(
            instance.service_id.clone(),
            Entry {
                instance,
                has_check: registration.check.is_some(),
                status: CheckStatus::Passing,
            },
        );
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        self.ensure_available()?;
        self.services
            .write()
            .remove(service_id)
            .map(|_| ())
            .ok_or_else(|| DiscoveryError::DeregistrationFailed(format!("unknown service id {}", service_id)))
    }

    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        self.ensure_available()?;
        self.instance_queries.fetch_add(1, Ordering::SeqCst);

        let services = self.services.read();
        let mut instances: Vec<ServiceInstance> = services
            .values()
            .filter(|e| e.instance.service_name == service_name && e.status.is_passing())
            .map(|e| e.instance.clone())
            .collect();
        instances.sort_by(|a, b| a.service_id.cmp(&b.service_id));

        Ok(instances)
    }

    async fn catalog_services(&self) -> Result<HashMap<String, Vec<String>>> {
        self.ensure_available()?;

        let mut catalog: HashMap<String, BTreeSet<String>> = HashMap::new();
        for entry in self.services.read().values() {
            catalog
                .entry(entry.instance.service_name.clone())
                .or_default()
                .extend(entry.instance.tags.iter().cloned());
        }

        Ok(catalog
            .into_iter()
            .map(|(name, tags)| (name, tags.into_iter().collect()))
            .collect())
    }

    async fn health_checks(&self, service_id: &str) -> Result<Vec<HealthCheck>> {
        self.ensure_available()?;

        let services = self.services.read();
        let checks = match services.get(service_id) {
            Some(entry) if entry.has_check => vec![HealthCheck {
                check_id: format!("service:{}", service_id),
                name: format!("Service '{}' check", entry.instance.service_name),
                status: entry.status,
                service_id: service_id.to_string(),
                service_name: entry.instance.service_name.clone(),
                output: String::new(),
            }],
            _ => Vec::new(),
        };

        Ok(checks)
    }
}
