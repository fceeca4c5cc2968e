// Meridian - service discovery and resilient service-to-service HTTP
//
// This library wires the Meridian crates together behind an explicitly
// constructed `ServiceContext`.

//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ServiceContext::from_env()?;
//!     context.init_logging()?;
//!     context.start().await?;
//!
//!     let orders = context
//!         .service_client()?
//!         .get("orders", "/orders/42")
//!         .send()
//!         .await?;
//!     println!("{}", orders.status());
//!
//!     context.close().await;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod registration;

pub use context::ServiceContext;
pub use error::{ContextError, Result};
pub use registration::ServiceRegistration;

// Re-export the member crates
pub use meridian_config;
pub use meridian_discovery;
pub use meridian_http_client;
pub use meridian_log;

/// Prelude for common imports.
///
/// ```
/// use meridian::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{ContextError, ServiceContext, ServiceRegistration};
    pub use meridian_config::{Settings, SettingsBuilder};
    pub use meridian_discovery::{
        DiscoveryClient, HealthChecker, Registration, ServiceClient, ServiceClientError,
        ServiceInstance,
    };
    pub use meridian_http_client::{HttpClient, HttpClientConfig, Response, RetryConfig};
}
