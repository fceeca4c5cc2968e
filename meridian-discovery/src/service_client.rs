//! Calls to other services by logical name

use crate::client::DiscoveryClient;
use crate::error::ServiceClientError;
use crate::service::ServiceInstance;
use http::{HeaderMap, Method};
use meridian_http_client::{Bytes, HttpClient, HttpClientError, Response};
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Resolves a service name through discovery and sends the request to one
/// of its instances through the retrying [`HttpClient`].
#[derive(Clone)]
pub struct ServiceClient {
    discovery: DiscoveryClient,
    http: HttpClient,
}

impl ServiceClient {
    pub fn new(discovery: DiscoveryClient, http: HttpClient) -> Self {
        Self { discovery, http }
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Pick an instance of `service_name` uniformly at random, preferring
    /// instances not flagged unhealthy by the health checker.
    pub async fn resolve(&self, service_name: &str) -> Result<ServiceInstance, ServiceClientError> {
        let instances = self.discovery.discover(service_name).await;
        select_instance(&instances)
            .cloned()
            .ok_or_else(|| ServiceClientError::NoInstances(service_name.to_string()))
    }

    pub fn request(
        &self,
        service_name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> ServiceRequest<'_> {
        ServiceRequest::new(self, service_name.into(), method, path.into())
    }

    pub fn get(&self, service_name: impl Into<String>, path: impl Into<String>) -> ServiceRequest<'_> {
        self.request(service_name, Method::GET, path)
    }

    pub fn post(&self, service_name: impl Into<String>, path: impl Into<String>) -> ServiceRequest<'_> {
        self.request(service_name, Method::POST, path)
    }

    pub fn put(&self, service_name: impl Into<String>, path: impl Into<String>) -> ServiceRequest<'_> {
        self.request(service_name, Method::PUT, path)
    }

    pub fn patch(&self, service_name: impl Into<String>, path: impl Into<String>) -> ServiceRequest<'_> {
        self.request(service_name, Method::PATCH, path)
    }

    pub fn delete(&self, service_name: impl Into<String>, path: impl Into<String>) -> ServiceRequest<'_> {
        self.request(service_name, Method::DELETE, path)
    }
}

/// Instances not flagged unhealthy, or all of them if every one is flagged
fn select_instance(instances: &[ServiceInstance]) -> Option<&ServiceInstance> {
    let healthy: Vec<&ServiceInstance> = instances.iter().filter(|i| i.healthy).collect();
    let mut rng = rand::rng();
    if healthy.is_empty() {
        instances.choose(&mut rng)
    } else {
        healthy.choose(&mut rng).copied()
    }
}

/// Join `path` onto the instance base URL
fn instance_url(instance: &ServiceInstance, path: &str) -> Result<url::Url, ServiceClientError> {
    let base = url::Url::parse(&instance.url())
        .map_err(|e| ServiceClientError::InvalidUrl(format!("{}: {}", instance.url(), e)))?;
    base.join(path)
        .map_err(|e| ServiceClientError::InvalidUrl(format!("{}: {}", path, e)))
}

/// A request to a service resolved at send time.
pub struct ServiceRequest<'a> {
    client: &'a ServiceClient,
    service_name: String,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    json: Option<serde_json::Value>,
    form: Option<Vec<(String, String)>>,
    body: Option<Bytes>,
    bearer: Option<String>,
    timeout: Option<Duration>,
    error: Option<ServiceClientError>,
}

impl<'a> ServiceRequest<'a> {
    fn new(client: &'a ServiceClient, service_name: String, method: Method, path: String) -> Self {
        Self {
            client,
            service_name,
            method,
            path,
            headers: HeaderMap::new(),
            query: Vec::new(),
            json: None,
            form: None,
            body: None,
            bearer: None,
            timeout: None,
            error: None,
        }
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            http::HeaderName::try_from(name.as_ref()),
            http::HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.error.get_or_insert(ServiceClientError::Http(
                    HttpClientError::RequestBuild(format!(
                        "invalid header: {}",
                        name.as_ref()
                    )),
                ));
            }
        }
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// JSON body; wins over [`form`](Self::form) when both are set
    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        match serde_json::to_value(json) {
            Ok(value) => self.json = Some(value),
            Err(e) => {
                self.error.get_or_insert(ServiceClientError::Http(
                    HttpClientError::Json(e.to_string()),
                ));
            }
        }
        self
    }

    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form = Some(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve an instance and send. Discovery is not retried; the HTTP call
    /// goes through the client's retry policy.
    pub async fn send(self) -> Result<Response, ServiceClientError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let instance = self.client.resolve(&self.service_name).await?;
        let url = instance_url(&instance, &self.path)?;

        debug!(
            service = %self.service_name,
            service_id = %instance.service_id,
            method = %self.method,
            url = %url,
            "Calling service instance"
        );

        let mut request = self
            .client
            .http
            .request(self.method, url.as_str())
            .headers(self.headers)
            .queries(self.query);

        if let Some(json) = &self.json {
            request = request.json(json);
        } else if let Some(form) = &self.form {
            request = request.form(form);
        } else if let Some(body) = self.body {
            request = request.body(body);
        }
        if let Some(token) = self.bearer {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        Ok(request.send().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, healthy: bool) -> ServiceInstance {
        let mut instance = ServiceInstance::new(id, "orders", "10.0.0.4", 9000);
        instance.healthy = healthy;
        instance
    }

    #[test]
    fn test_select_prefers_healthy() {
        let instances = vec![
            instance("orders-1", false),
            instance("orders-2", true),
            instance("orders-3", false),
        ];

        for _ in 0..50 {
            assert_eq!(select_instance(&instances).unwrap().service_id, "orders-2");
        }
    }

    #[test]
    fn test_select_falls_back_when_all_flagged() {
        let instances = vec![instance("orders-1", false), instance("orders-2", false)];
        assert!(select_instance(&instances).is_some());
        assert!(select_instance(&[]).is_none());
    }

    #[test]
    fn test_select_covers_all_healthy_instances() {
        let instances = vec![instance("orders-1", true), instance("orders-2", true)];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(select_instance(&instances).unwrap().service_id.clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_instance_url_join() {
        let instance = instance("orders-1", true);

        assert_eq!(
            instance_url(&instance, "/orders/7").unwrap().as_str(),
            "http://10.0.0.4:9000/orders/7"
        );
        assert_eq!(
            instance_url(&instance, "orders?status=open").unwrap().as_str(),
            "http://10.0.0.4:9000/orders?status=open"
        );
    }
}
