//! HTTP client implementation.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::{
    AttemptOutcome, HttpClientConfig, HttpClientError, HttpRequest, ReqwestTransport,
    RequestBuilder, Response, Result, Transport,
};

/// HTTP client with bounded retry, backoff and timeout support.
///
/// Clones share the connection pool, default headers and closed state.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    config: Arc<HttpClientConfig>,
    default_headers: Arc<RwLock<HeaderMap>>,
    closed: Arc<AtomicBool>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client that sends every attempt through `transport`.
    pub fn with_transport(config: HttpClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        Ok(Self {
            transport,
            config: Arc::new(config),
            default_headers: Arc::new(RwLock::new(headers)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Snapshot of the headers applied to every request.
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers.read().clone()
    }

    /// Add or replace a default header.
    pub fn add_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.write().insert(name, value);
        Ok(())
    }

    /// Remove a default header. Returns whether it was present.
    pub fn remove_header(&self, name: &str) -> bool {
        self.default_headers.write().remove(name).is_some()
    }

    /// Stop accepting requests. Pooled connections are released once the
    /// last clone is dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("HTTP client closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, url.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Create a PUT request builder.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PUT, url.into())
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PATCH, url.into())
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, url.into())
    }

    /// Create a HEAD request builder.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::HEAD, url.into())
    }

    /// Create a request builder with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url.into())
    }

    /// Execute a request, retrying 5xx/429 responses and transport errors.
    ///
    /// At most `max_retries + 1` attempts are made. When retries run out the
    /// last retryable response is returned as `Ok`, or the last transport
    /// error as `Err`.
    pub async fn execute(&self, request: HttpRequest) -> Result<Response> {
        if self.is_closed() {
            return Err(HttpClientError::Closed);
        }

        let retry = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            let result = self.transport.send(&request).await;

            let failure = match retry.classify(result) {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::Fatal(error) => return Err(error),
                AttemptOutcome::Retryable(failure) => failure,
            };

            if attempt >= retry.max_retries {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    attempts = attempt + 1,
                    reason = %failure.describe(),
                    "Retries exhausted"
                );
                return failure.into_result();
            }

            let delay = retry.delay_after(attempt, &failure);
            warn!(
                method = %request.method,
                url = %request.url,
                attempt = attempt + 1,
                max_retries = retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                reason = %failure.describe(),
                "Request failed, retrying"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::try_from(name)
        .map_err(|e| HttpClientError::RequestBuild(format!("invalid header name {}: {}", name, e)))?;
    let header_value = HeaderValue::try_from(value)
        .map_err(|e| HttpClientError::RequestBuild(format!("invalid value for {}: {}", name, e)))?;
    Ok((header_name, header_value))
}
