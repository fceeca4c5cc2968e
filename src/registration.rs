//! Self-registration of the running service.

use crate::context::ServiceContext;
use crate::error::{ContextError, Result};
use meridian_discovery::{DiscoveryClient, Registration};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Handle to a registration of this service with the registry.
///
/// The handle is also kept by the [`ServiceContext`] so that
/// [`ServiceContext::close`] deregisters it.
pub struct ServiceRegistration {
    discovery: DiscoveryClient,
    service_id: String,
    service_name: String,
    active: AtomicBool,
}

impl ServiceRegistration {
    /// Register this service using the `service` settings of the context.
    ///
    /// The registration carries the configured tags plus `version` and
    /// `environment` metadata, and the default HTTP health check against
    /// `http://{advertise_address}:{port}/health`.
    pub async fn register(context: &ServiceContext) -> Result<Arc<Self>> {
        let discovery = context.discovery()?;
        let settings = context.settings();
        let service = &settings.service;

        let registration = Registration::new(
            service.name.clone(),
            service.advertise_address.clone(),
            service.port,
        )
        .with_tags(service.tags.iter().cloned())
        .with_meta("version", service.api_version.clone())
        .with_meta("environment", settings.environment.clone());

        let service_id = discovery
            .register_with_id(registration)
            .await
            .ok_or_else(|| ContextError::Registration(service.name.clone()))?;

        info!(
            service = %service.name,
            service_id = %service_id,
            "Self-registration complete"
        );

        let handle = Arc::new(Self {
            discovery,
            service_id,
            service_name: service.name.clone(),
            active: AtomicBool::new(true),
        });
        context.set_registration(handle.clone());
        Ok(handle)
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn is_registered(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove the registration. Returns `false` if it was already removed or
    /// the registry refused.
    pub async fn deregister(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }

        if self.discovery.deregister(&self.service_id).await {
            true
        } else {
            warn!(service_id = %self.service_id, "Self-deregistration failed");
            self.active.store(true, Ordering::SeqCst);
            false
        }
    }
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("service_id", &self.service_id)
            .field("service_name", &self.service_name)
            .field("active", &self.is_registered())
            .finish()
    }
}
