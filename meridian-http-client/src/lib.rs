//! # Meridian HTTP Client
//!
//! HTTP client for service-to-service calls with bounded retries,
//! exponential backoff and `Retry-After` support.
//!
//! ## Features
//!
//! - **Retry with Backoff**: 5xx, 429 and transport failures are retried up to
//!   `max_retries` times with exponential backoff capped at 30 seconds
//! - **Retry-After**: a server-provided delay in seconds overrides the backoff
//! - **Timeouts**: Per-request and global timeout configuration
//! - **Connection Pooling**: Efficient connection reuse
//! - **Pluggable Transport**: the retry driver sends through a [`Transport`]
//!
//! Once retries are exhausted a retryable response (for example a final 503)
//! is returned to the caller as `Ok`; only transport errors are raised.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian_http_client::{HttpClient, HttpClientConfig, RetryConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpClientConfig::builder()
//!         .timeout(Duration::from_secs(30))
//!         .retry(RetryConfig::exponential(3, Duration::from_millis(100)))
//!         .build();
//!
//!     let client = HttpClient::new(config)?;
//!
//!     let response = client
//!         .post("http://orders.internal:8080/orders")
//!         .json(&serde_json::json!({"item": "widget", "quantity": 5}))
//!         .send()
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod transport;

pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::{HttpRequest, RequestBuilder};
pub use response::Response;
pub use retry::{AttemptOutcome, BackoffStrategy, RetryConfig, RetryableFailure, parse_retry_after};
pub use transport::{ReqwestTransport, Transport};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use meridian_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::HttpClient;
    pub use crate::config::{HttpClientConfig, HttpClientConfigBuilder};
    pub use crate::error::{HttpClientError, Result};
    pub use crate::request::{HttpRequest, RequestBuilder};
    pub use crate::response::Response;
    pub use crate::retry::{BackoffStrategy, RetryConfig};
    pub use crate::transport::Transport;
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
