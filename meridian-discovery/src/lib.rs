//! Service Discovery for Meridian
//!
//! This crate provides service registration, cached discovery, health
//! checking and name-based service-to-service calls.
//!
//! ## Features
//!
//! - **Service Registration** - Register instances with an HTTP health check
//! - **Service Discovery** - Find passing instances, cached per service with a TTL
//! - **Health Checks** - Probe `/health` endpoints and track healthy services
//! - **Service Calls** - Pick a random healthy instance and call it with retries
//! - **Backends** - Consul or in-memory
//!
//! [`DiscoveryClient`] never raises: registry failures are logged and turned
//! into `false` or empty results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian_discovery::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let discovery = DiscoveryClient::consul(
//!         "localhost",
//!         8500,
//!         Duration::from_secs(10),
//!         Duration::from_secs(30),
//!     )?;
//!
//!     let registration = Registration::new("orders", "10.0.0.4", 9000).with_tag("v1");
//!     if let Some(id) = discovery.register_with_id(registration).await {
//!         println!("registered as {id}");
//!     }
//!
//!     for instance in discovery.discover("orders").await {
//!         println!("Found: {}", instance.url());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Calling a Service by Name
//!
//! ```rust,no_run
//! use meridian_discovery::*;
//! use meridian_http_client::{HttpClient, HttpClientConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let discovery = DiscoveryClient::new(Arc::new(InMemoryRegistry::new()), Duration::from_secs(30));
//! let http = HttpClient::new(HttpClientConfig::default())?;
//! let services = ServiceClient::new(discovery, http);
//!
//! let response = services.get("orders", "/orders/7").send().await?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod consul;
pub mod error;
pub mod health;
pub mod memory;
pub mod service;
pub mod service_client;

pub use cache::{DEFAULT_CACHE_TTL, ServiceCache};
pub use client::DiscoveryClient;
pub use consul::ConsulRegistry;
pub use error::{DiscoveryError, Result, ServiceClientError};
pub use health::{DEFAULT_PROBE_TIMEOUT, HealthChecker};
pub use memory::InMemoryRegistry;
pub use service::{
    CheckStatus, HealthCheck, HealthCheckSpec, Registration, RegistryBackend, ServiceInstance,
};
pub use service_client::{ServiceClient, ServiceRequest};
