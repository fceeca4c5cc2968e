//! HealthChecker against mocked service endpoints

use meridian_discovery::*;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn health_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn checker() -> (InMemoryRegistry, HealthChecker) {
    let registry = InMemoryRegistry::new();
    let discovery = DiscoveryClient::new(Arc::new(registry.clone()), Duration::from_secs(30));
    (registry, HealthChecker::new(discovery).unwrap())
}

fn registration_for(name: &str, id: &str, server: &MockServer) -> Registration {
    let addr = server.address();
    Registration::new(name, addr.ip().to_string(), addr.port()).with_id(id)
}

#[tokio::test]
async fn test_check_endpoint() {
    let (_, checker) = checker();
    let up = health_server(200).await;
    let down = health_server(503).await;
    let redirect = health_server(204).await;

    assert!(checker.check_endpoint(&format!("{}/health", up.uri())).await);
    assert!(!checker.check_endpoint(&format!("{}/health", down.uri())).await);
    // Only exactly 200 counts
    assert!(!checker.check_endpoint(&format!("{}/health", redirect.uri())).await);
}

#[tokio::test]
async fn test_check_endpoint_appends_health_path() {
    let (_, checker) = checker();
    let server = health_server(200).await;

    assert!(checker.check_endpoint(&server.uri()).await);
    assert!(checker.check_endpoint(&format!("{}/", server.uri())).await);
}

#[tokio::test]
async fn test_check_endpoint_failures_are_false() {
    let (_, checker) = checker();

    assert!(!checker.check_endpoint("http://127.0.0.1:1/health").await);
    assert!(!checker.check_endpoint("not a url").await);
}

#[tokio::test]
async fn test_check_endpoint_times_out() {
    let registry = InMemoryRegistry::new();
    let discovery = DiscoveryClient::new(Arc::new(registry), Duration::from_secs(30));
    let checker = HealthChecker::with_timeout(discovery, Duration::from_millis(50)).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    assert!(!checker.check_endpoint(&server.uri()).await);
}

#[tokio::test]
async fn test_check_all_services() {
    let (registry, checker) = checker();
    let up = health_server(200).await;
    let down = health_server(500).await;

    let discovery = DiscoveryClient::new(Arc::new(registry.clone()), Duration::from_secs(30));
    assert!(discovery.register(registration_for("orders", "orders-1", &up)).await);
    assert!(discovery.register(registration_for("billing", "billing-1", &down)).await);
    assert!(discovery.register(registration_for("ghost", "ghost-1", &up)).await);
    registry.set_check_status("ghost-1", CheckStatus::Critical);

    let results = checker.check_all_services().await;

    assert_eq!(results.len(), 3);
    assert!(results["orders"]);
    assert!(!results["billing"]);
    // No passing instances
    assert!(!results["ghost"]);

    assert!(checker.is_healthy("orders"));
    assert!(!checker.is_healthy("billing"));
    assert_eq!(checker.healthy_services(), vec!["orders".to_string()]);
    assert_eq!(
        checker.unhealthy_services(),
        vec!["billing".to_string(), "ghost".to_string()]
    );
}

#[tokio::test]
async fn test_sweeps_keep_sets_disjoint() {
    let (registry, checker) = checker();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let discovery = DiscoveryClient::new(Arc::new(registry), Duration::from_secs(30));
    discovery
        .register(registration_for("orders", "orders-1", &server))
        .await;

    checker.check_all_services().await;
    assert_eq!(checker.healthy_services(), vec!["orders".to_string()]);
    assert!(checker.unhealthy_services().is_empty());

    checker.check_all_services().await;
    assert!(checker.healthy_services().is_empty());
    assert_eq!(checker.unhealthy_services(), vec!["orders".to_string()]);
}

#[tokio::test]
async fn test_probe_marks_cached_instance() {
    let registry = InMemoryRegistry::new();
    let discovery = DiscoveryClient::new(Arc::new(registry), Duration::from_secs(30));
    let checker = HealthChecker::new(discovery.clone()).unwrap();
    let down = health_server(503).await;

    discovery
        .register(registration_for("billing", "billing-1", &down))
        .await;

    checker.check_all_services().await;

    let cached = discovery.cache().get("billing");
    assert_eq!(cached.len(), 1);
    assert!(!cached[0].healthy);
    assert!(cached[0].last_check_time.is_some());
}

#[tokio::test]
async fn test_closed_checker() {
    let (_, checker) = checker();
    let server = health_server(200).await;

    checker.close();
    assert!(!checker.check_endpoint(&server.uri()).await);
}
