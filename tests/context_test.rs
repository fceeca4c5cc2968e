//! Integration tests for the service context lifecycle.

use meridian::prelude::*;
use meridian_discovery::InMemoryRegistry;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.environment = "staging".to_string();
    settings.service.name = "gateway".to_string();
    settings.service.advertise_address = "10.0.0.9".to_string();
    settings.service.port = 8080;
    settings.service.api_version = "2.1.0".to_string();
    settings.service.tags = vec!["edge".to_string()];
    settings.http_client.backoff_base_ms = 1;
    settings
}

fn open_in_memory(settings: Settings) -> (InMemoryRegistry, ServiceContext) {
    let registry = InMemoryRegistry::new();
    let context = ServiceContext::new(settings);
    context
        .open_with_backend(Arc::new(registry.clone()))
        .unwrap();
    (registry, context)
}

// =============================================================================
// Self-registration
// =============================================================================

#[tokio::test]
async fn test_self_registration_uses_service_settings() {
    let (registry, context) = open_in_memory(settings());

    let registration = context.register_self_if_enabled().await.unwrap().unwrap();

    assert!(registration.is_registered());
    assert!(registration.service_id().starts_with("gateway-"));
    assert_eq!(registry.count(), 1);

    let instances = context.discovery().unwrap().discover("gateway").await;
    assert_eq!(instances.len(), 1);
    let instance = &instances[0];
    assert_eq!(instance.service_id, registration.service_id());
    assert_eq!(instance.address, "10.0.0.9");
    assert_eq!(instance.port, 8080);
    assert_eq!(instance.tags, vec!["edge".to_string()]);
    assert_eq!(instance.meta["version"], "2.1.0");
    assert_eq!(instance.meta["environment"], "staging");
}

#[tokio::test]
async fn test_self_registration_disabled() {
    let mut settings = settings();
    settings.discovery.register_self = false;
    let (registry, context) = open_in_memory(settings);

    assert!(context.register_self_if_enabled().await.unwrap().is_none());
    assert!(context.registration().is_none());
    assert_eq!(registry.count(), 0);
}

#[tokio::test]
async fn test_self_registration_failure() {
    let (registry, context) = open_in_memory(settings());
    registry.set_available(false);

    let result = ServiceRegistration::register(&context).await;

    assert!(matches!(result, Err(ContextError::Registration(ref name)) if name == "gateway"));
    assert!(context.registration().is_none());
}

#[tokio::test]
async fn test_registration_requires_open_context() {
    let context = ServiceContext::new(settings());

    let result = ServiceRegistration::register(&context).await;
    assert!(matches!(result, Err(ContextError::NotOpen)));
}

#[tokio::test]
async fn test_deregister_is_one_shot() {
    let (registry, context) = open_in_memory(settings());
    let registration = ServiceRegistration::register(&context).await.unwrap();

    assert!(registration.deregister().await);
    assert!(!registration.is_registered());
    assert_eq!(registry.count(), 0);

    assert!(!registration.deregister().await);
}

#[tokio::test]
async fn test_failed_deregister_stays_registered() {
    let (registry, context) = open_in_memory(settings());
    let registration = ServiceRegistration::register(&context).await.unwrap();

    registry.set_available(false);
    assert!(!registration.deregister().await);
    assert!(registration.is_registered());

    registry.set_available(true);
    assert!(registration.deregister().await);
}

// =============================================================================
// Close
// =============================================================================

#[tokio::test]
async fn test_close_deregisters_self() {
    let (registry, context) = open_in_memory(settings());
    let registration = context.register_self_if_enabled().await.unwrap().unwrap();
    let discovery = context.discovery().unwrap();

    context.close().await;

    assert_eq!(registry.count(), 0);
    assert!(!registration.is_registered());
    assert!(context.registration().is_none());
    assert!(!context.is_open());
    // The closed discovery client no longer answers
    assert!(discovery.discover("gateway").await.is_empty());
}

#[tokio::test]
async fn test_close_keeps_registration_when_deregister_fails() {
    let (registry, context) = open_in_memory(settings());
    let registration = context.register_self_if_enabled().await.unwrap().unwrap();

    registry.set_available(false);
    assert!(!context.close().await);
    assert!(context.is_open());
    assert!(registration.is_registered());
    let kept = context.registration().unwrap();
    assert_eq!(kept.service_id(), registration.service_id());

    registry.set_available(true);
    assert!(context.close().await);
    assert_eq!(registry.count(), 0);
    assert!(!registration.is_registered());
    assert!(context.registration().is_none());
    assert!(!context.is_open());
}

#[tokio::test]
async fn test_close_without_registration() {
    let mut settings = settings();
    settings.discovery.register_self = false;
    let (_, context) = open_in_memory(settings);
    let health = context.health_checker().unwrap();

    context.close().await;

    assert!(!context.is_open());
    assert!(health.healthy_services().is_empty());
    assert!(matches!(context.health_checker(), Err(ContextError::NotOpen)));
}

// =============================================================================
// Against a mocked Consul agent
// =============================================================================

#[tokio::test]
async fn test_start_and_close_against_consul() {
    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .and(body_partial_json(json!({
            "Name": "gateway",
            "Address": "10.0.0.9",
            "Port": 8080,
            "Tags": ["edge"],
            "Meta": {"version": "2.1.0", "environment": "staging"},
            "Check": {"HTTP": "http://10.0.0.9:8080/health"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v1/agent/service/deregister/gateway-.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;

    let mut settings = settings();
    settings.discovery.consul_host = consul.address().ip().to_string();
    settings.discovery.consul_port = consul.address().port();
    let context = ServiceContext::new(settings);

    let registration = context.start().await.unwrap().unwrap();
    assert!(context.is_open());
    assert!(registration.service_id().starts_with("gateway-"));

    context.close().await;
    assert!(!registration.is_registered());
}

#[tokio::test]
async fn test_service_call_through_context() {
    let orders = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&orders)
        .await;

    let mut settings = settings();
    settings.discovery.register_self = false;
    let (_, context) = open_in_memory(settings);

    let addr = orders.address();
    let registered = context
        .discovery()
        .unwrap()
        .register(Registration::new("orders", addr.ip().to_string(), addr.port()).with_id("orders-1"))
        .await;
    assert!(registered);

    let response = context
        .service_client()
        .unwrap()
        .get("orders", "/orders/42")
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["id"], 42);

    context.close().await;
}
