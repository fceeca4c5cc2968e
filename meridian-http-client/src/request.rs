//! Request value type and builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::time::Duration;

/// A fully resolved request, ready to hand to a [`Transport`](crate::Transport).
///
/// Cheap to clone, so the retry driver can resend it on every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute request URL, query included.
    pub url: url::Url,
    /// Headers, defaults already merged in.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<Bytes>,
    /// Per-request timeout overriding the client default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a bodiless request.
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// HTTP request builder.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    url: String,
    base_url: Option<String>,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    json: Option<Vec<u8>>,
    form: Option<String>,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    error: Option<HttpClientError>,
}

impl<'a> RequestBuilder<'a> {
    /// Create a new request builder.
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            base_url: None,
            headers: HeaderMap::new(),
            query: Vec::new(),
            json: None,
            form: None,
            body: None,
            timeout: None,
            error: None,
        }
    }

    /// Resolve the request URL against this base instead of the client's.
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Add a header to the request.
    ///
    /// Invalid names or values are reported when the request is sent.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(HttpClientError::RequestBuild(format!(
                "invalid header: {}",
                name
            ))),
        }
        self
    }

    /// Add multiple headers to the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.query.push((k.into(), v.into()));
        }
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body = Some(Bytes::from(text.into()));
        self
    }

    /// Set the request body as JSON. Takes precedence over [`form`](Self::form).
    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => self.json = Some(bytes),
            Err(e) => self.fail(HttpClientError::Json(e.to_string())),
        }
        self
    }

    /// Set the request body as form data.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => self.form = Some(encoded),
            Err(e) => self.fail(HttpClientError::RequestBuild(format!(
                "failed to encode form data: {}",
                e
            ))),
        }
        self
    }

    /// Set a custom timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Set basic authentication.
    pub fn basic_auth(self, username: impl AsRef<str>, password: Option<impl AsRef<str>>) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.as_ref(), p.as_ref()),
            None => format!("{}:", username.as_ref()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    fn fail(&mut self, error: HttpClientError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Build the URL with query parameters.
    fn build_url(&self) -> Result<url::Url> {
        let base = self
            .base_url
            .as_deref()
            .or(self.client.config().base_url.as_deref());

        let mut url = match base {
            Some(base) => {
                let base =
                    url::Url::parse(base).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
                base.join(&self.url)
                    .map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
            }
            None => {
                url::Url::parse(&self.url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
            }
        };

        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Resolve the builder into a request without sending it.
    ///
    /// Client default headers are applied first so per-request headers win.
    pub fn build(mut self) -> Result<HttpRequest> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let url = self.build_url()?;
        let mut headers = self.client.default_headers();
        headers.extend(self.headers);

        let body = if let Some(json) = self.json {
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            Some(Bytes::from(json))
        } else if let Some(form) = self.form {
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            Some(Bytes::from(form))
        } else {
            self.body
        };

        Ok(HttpRequest {
            method: self.method,
            url,
            headers,
            body,
            timeout: self.timeout,
        })
    }

    /// Send the request through the client's retry driver.
    pub async fn send(self) -> Result<Response> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }
}
