//! Single-attempt request transport.

use crate::{HttpClientConfig, HttpClientError, HttpRequest, Response, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Sends one request and buffers the response. No retries happen here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single attempt.
    async fn send(&self, request: &HttpRequest) -> Result<Response>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build the underlying reqwest client from the configuration.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli);

        if let Some(max) = config.max_connections {
            builder = builder.pool_max_idle_per_host(max);
        }

        builder = if config.follow_redirects {
            builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        } else {
            builder.redirect(reqwest::redirect::Policy::none())
        };

        let inner = builder
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            timeout: config.timeout,
        })
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<Response> {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let timeout = request.timeout.unwrap_or(self.timeout);
        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        Response::from_reqwest(response)
            .await
            .map_err(|e| match e {
                HttpClientError::Transport(e) => classify_error(e, timeout),
                other => other,
            })
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> HttpClientError {
    if error.is_timeout() {
        HttpClientError::Timeout(timeout)
    } else if error.is_connect() {
        HttpClientError::Connection(error.to_string())
    } else {
        HttpClientError::Transport(error)
    }
}
