//! Explicitly constructed service context.
//!
//! A [`ServiceContext`] is built from [`Settings`] and owns the shared HTTP
//! client, discovery client and health checker. Nothing is created until
//! [`open`](ServiceContext::open) and everything is released by
//! [`close`](ServiceContext::close).

use crate::error::{ContextError, Result};
use crate::registration::ServiceRegistration;
use meridian_config::{Settings, Validate};
use meridian_discovery::{
    ConsulRegistry, DiscoveryClient, HealthChecker, RegistryBackend, ServiceClient,
};
use meridian_http_client::{HttpClient, HttpClientConfig};
use meridian_log::LogConfig;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct Components {
    http: HttpClient,
    discovery: DiscoveryClient,
    health: Arc<HealthChecker>,
    services: ServiceClient,
}

/// Owner of the discovery and HTTP components of one service process.
pub struct ServiceContext {
    settings: Settings,
    components: RwLock<Option<Components>>,
    registration: Mutex<Option<Arc<ServiceRegistration>>>,
}

impl ServiceContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            components: RwLock::new(None),
            registration: Mutex::new(None),
        }
    }

    /// Context from `.env` and `MERIDIAN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let settings = Settings::builder().load_dotenv(None).load_env().build()?;
        Ok(Self::new(settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Install the global log subscriber from the `logging` settings.
    ///
    /// `debug = true` forces debug level. An already installed subscriber is
    /// left alone.
    pub fn init_logging(&self) -> Result<()> {
        let level = if self.settings.debug {
            "debug"
        } else {
            self.settings.logging.level.as_str()
        };
        let config = LogConfig::from_names(level, &self.settings.logging.format);
        meridian_log::init(&config)?;
        Ok(())
    }

    /// Build the components against the Consul agent from the settings.
    pub fn open(&self) -> Result<()> {
        if self.is_open() {
            debug!("Service context already open");
            return Ok(());
        }
        self.settings.validate()?;

        let discovery = &self.settings.discovery;
        let registry = ConsulRegistry::new(discovery.consul_url(), discovery.consul_timeout()?)?;
        self.open_with_backend(Arc::new(registry))
    }

    /// Build the components against an arbitrary registry backend.
    ///
    /// Opening an open context is a no-op.
    pub fn open_with_backend(&self, backend: Arc<dyn RegistryBackend>) -> Result<()> {
        let mut components = self.components.write();
        if components.is_some() {
            debug!("Service context already open");
            return Ok(());
        }

        self.settings.validate()?;

        let http_settings = &self.settings.http_client;
        let http = HttpClient::new(
            HttpClientConfig::builder()
                .timeout(http_settings.timeout()?)
                .max_retries(http_settings.max_retries, http_settings.backoff_base())
                .max_connections(Some(http_settings.max_connections))
                .follow_redirects(http_settings.follow_redirects)
                .build(),
        )?;

        let discovery = DiscoveryClient::new(backend, self.settings.discovery.cache_ttl());
        let health = Arc::new(HealthChecker::new(discovery.clone())?);
        let services = ServiceClient::new(discovery.clone(), http.clone());

        *components = Some(Components {
            http,
            discovery,
            health,
            services,
        });

        info!(
            service = %self.settings.service.name,
            environment = %self.settings.environment,
            "Service context opened"
        );
        Ok(())
    }

    /// Open the context and, when `discovery.register_self` is set, register
    /// this service.
    pub async fn start(&self) -> Result<Option<Arc<ServiceRegistration>>> {
        self.open()?;
        self.register_self_if_enabled().await
    }

    /// Register this service if `discovery.register_self` is set.
    pub async fn register_self_if_enabled(&self) -> Result<Option<Arc<ServiceRegistration>>> {
        if !self.settings.discovery.register_self {
            debug!("Self-registration disabled");
            return Ok(None);
        }
        ServiceRegistration::register(self).await.map(Some)
    }

    pub fn is_open(&self) -> bool {
        self.components.read().is_some()
    }

    fn components(&self) -> Result<Components> {
        self.components.read().clone().ok_or(ContextError::NotOpen)
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        Ok(self.components()?.http)
    }

    pub fn discovery(&self) -> Result<DiscoveryClient> {
        Ok(self.components()?.discovery)
    }

    pub fn health_checker(&self) -> Result<Arc<HealthChecker>> {
        Ok(self.components()?.health)
    }

    pub fn service_client(&self) -> Result<ServiceClient> {
        Ok(self.components()?.services)
    }

    /// The live self-registration, if any.
    pub fn registration(&self) -> Option<Arc<ServiceRegistration>> {
        self.registration.lock().clone()
    }

    pub(crate) fn set_registration(&self, registration: Arc<ServiceRegistration>) {
        if let Some(previous) = self.registration.lock().replace(registration)
            && previous.is_registered()
        {
            warn!(
                service_id = %previous.service_id(),
                "Replacing a live self-registration; the previous one stays registered"
            );
        }
    }

    /// Deregister a live self-registration and release all components.
    ///
    /// When the deregistration fails the handle is kept and the context stays
    /// open, so a later `close` retries it. Returns whether the context is
    /// closed. Closing a closed context is a no-op.
    pub async fn close(&self) -> bool {
        let registration = self.registration.lock().take();
        if let Some(registration) = registration
            && registration.is_registered()
            && !registration.deregister().await
        {
            warn!(
                service_id = %registration.service_id(),
                "Keeping the service context open until self-deregistration succeeds"
            );
            let mut slot = self.registration.lock();
            if slot.is_none() {
                *slot = Some(registration);
            }
            return false;
        }

        let components = self.components.write().take();
        if let Some(components) = components {
            components.health.close();
            components.discovery.close();
            components.http.close();
            info!(service = %self.settings.service.name, "Service context closed");
        }
        true
    }
}
