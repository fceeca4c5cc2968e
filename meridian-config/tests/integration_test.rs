//! Integration tests for meridian-config

use meridian_config::*;
use std::env;
use std::io::Write;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file_layer() {
    let file = write_file(
        ".toml",
        r#"
            environment = "production"

            [discovery]
            consul_host = "consul.service"
            consul_port = 8600
            service_cache_ttl_secs = 10

            [service]
            name = "gateway"
            tags = ["api-gateway", "v1"]
        "#,
    );

    let settings = Settings::builder()
        .add_file(file.path().to_string_lossy())
        .build()
        .unwrap();

    assert_eq!(settings.environment, "production");
    assert_eq!(settings.discovery.consul_url(), "http://consul.service:8600");
    assert_eq!(settings.discovery.service_cache_ttl_secs, 10);
    assert_eq!(settings.service.name, "gateway");
    assert_eq!(settings.service.tags, vec!["api-gateway", "v1"]);
    // Untouched sections keep their defaults
    assert_eq!(settings.http_client.max_retries, 3);
}

#[test]
fn test_json_file_layer() {
    let file = write_file(
        ".json",
        r#"{"http_client": {"timeout_secs": 5.0, "max_retries": 1}}"#,
    );

    let settings = Settings::builder()
        .add_file(file.path().to_string_lossy())
        .build()
        .unwrap();

    assert_eq!(settings.http_client.timeout_secs, 5.0);
    assert_eq!(settings.http_client.max_retries, 1);
}

#[test]
fn test_env_overrides_file() {
    let file = write_file(".toml", "[discovery]\nconsul_host = \"from-file\"\n");

    unsafe {
        env::set_var("MERIDIANITEST_DISCOVERY__CONSUL_HOST", "from-env");
        env::set_var("MERIDIANITEST_DISCOVERY__CONSUL_PORT", "9500");
    }

    let settings = Settings::builder()
        .with_prefix("MERIDIANITEST")
        .add_file(file.path().to_string_lossy())
        .load_env()
        .build()
        .unwrap();

    assert_eq!(settings.discovery.consul_host, "from-env");
    assert_eq!(settings.discovery.consul_port, 9500);

    unsafe {
        env::remove_var("MERIDIANITEST_DISCOVERY__CONSUL_HOST");
        env::remove_var("MERIDIANITEST_DISCOVERY__CONSUL_PORT");
    }
}

#[test]
fn test_invalid_file_value_fails_validation() {
    let file = write_file(".toml", "[http_client]\nmax_retries = 99\n");

    let result = Settings::builder()
        .add_file(file.path().to_string_lossy())
        .build();

    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_missing_file_is_load_error() {
    let result = Settings::builder()
        .add_file("/nonexistent/meridian.toml")
        .build();

    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("MYAPP".to_string()));

    unsafe {
        env::set_var("MYAPP_DISCOVERY__CONSUL_HOST", "consul");
    }

    let result = loader.load_var("discovery.consul_host");
    assert_eq!(result.unwrap(), "consul");

    unsafe {
        env::remove_var("MYAPP_DISCOVERY__CONSUL_HOST");
    }
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::Parse("test_key".to_string());
    let display = format!("{}", err);
    assert!(display.contains("test_key"));
}
