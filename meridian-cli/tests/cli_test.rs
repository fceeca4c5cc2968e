//! End-to-end tests of the `meridian` binary against mocked services.

use assert_cmd::Command;
use assert_cmd::assert::{Assert, OutputAssertExt};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn meridian(consul: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("meridian").unwrap();
    cmd.arg("--consul-host")
        .arg(consul.address().ip().to_string())
        .arg("--consul-port")
        .arg(consul.address().port().to_string())
        .arg("--no-color");
    cmd
}

// The binary blocks, so the mock servers need a second worker thread.
async fn run(mut cmd: Command) -> Assert {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap()
        .assert()
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("meridian")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn test_usage_error() {
    Command::cargo_bin("meridian")
        .unwrap()
        .args(["register", "--name", "orders"])
        .assert()
        .failure()
        .code(2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_services_json() {
    let consul = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": ["v1"],
            "billing": []
        })))
        .expect(1)
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args(["services", "--json"]);

    let assert = run(cmd).await.success();
    let stdout: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stdout, json!({"billing": [], "orders": ["v1"]}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discover_table() {
    let consul = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders"))
        .and(query_param("passing", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "Service": {
                "ID": "orders-1",
                "Service": "orders",
                "Address": "10.0.0.4",
                "Port": 9000,
                "Tags": ["v1"]
            }
        }])))
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args(["discover", "orders"]);

    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("orders-1"))
        .stdout(predicate::str::contains("10.0.0.4:9000"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_register_with_explicit_id() {
    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .and(body_partial_json(json!({
            "ID": "orders-7",
            "Name": "orders",
            "Tags": ["v1"],
            "Meta": {"version": "1.0.0"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args([
        "register", "--name", "orders", "--id", "orders-7", "--address", "10.0.0.4", "--port",
        "9000", "--tag", "v1", "--meta", "version=1.0.0", "--json",
    ]);

    let assert = run(cmd).await.success();
    let stdout: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stdout["service_id"], "orders-7");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_deregister_fails() {
    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/orders-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args(["deregister", "orders-1"]);

    run(cmd)
        .await
        .failure()
        .code(1)
        .stderr(predicate::str::contains("orders-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_probe() {
    let consul = MockServer::start().await;
    let service = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&service)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args(["probe", service.uri().as_str()]);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("healthy"));

    let mut cmd = meridian(&consul);
    cmd.args(["probe", "http://127.0.0.1:1/health", "--timeout", "1"]);
    run(cmd).await.failure().code(1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_resolves_and_prints_body() {
    let orders = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({"item": "widget"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&orders)
        .await;

    let consul = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "Service": {
                "ID": "orders-1",
                "Service": "orders",
                "Address": orders.address().ip().to_string(),
                "Port": orders.address().port()
            }
        }])))
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args([
        "call", "orders", "/orders", "-X", "post", "--data", r#"{"item":"widget"}"#, "--json",
    ]);

    let assert = run(cmd).await.success();
    let stdout: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stdout["status"], 201);
    assert_eq!(stdout["body"]["id"], 42);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_call_without_instances() {
    let consul = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health/service/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&consul)
        .await;

    let mut cmd = meridian(&consul);
    cmd.args(["call", "orders", "/orders"]);

    run(cmd)
        .await
        .failure()
        .code(3)
        .stderr(predicate::str::contains("No available instances"));
}
