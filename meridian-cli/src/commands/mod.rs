//! CLI command implementations.

pub mod call;
pub mod health;
pub mod registry;

use crate::GlobalArgs;
use crate::error::CliResult;
use meridian::ServiceContext;
use meridian_config::Settings;

/// Resolve settings from the config file, `.env`, the environment and the
/// command-line overrides, in increasing precedence.
pub fn load_settings(global: &GlobalArgs) -> CliResult<Settings> {
    let mut builder = Settings::builder();
    if let Some(path) = &global.config {
        builder = builder.add_file(path.clone());
    }
    builder = builder.load_dotenv(None).load_env();

    if let Some(host) = &global.consul_host {
        builder = builder.set("discovery.consul_host", host)?;
    }
    if let Some(port) = global.consul_port {
        builder = builder.set("discovery.consul_port", port)?;
    }

    Ok(builder.build()?)
}

/// Open a context against the configured registry. Commands never
/// self-register.
pub fn open_context(global: &GlobalArgs) -> CliResult<ServiceContext> {
    let context = ServiceContext::new(load_settings(global)?);
    context.open()?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_win_over_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[discovery]\nconsul_host = \"consul.file\"\nconsul_port = 8600\nservice_cache_ttl_secs = 12"
        )
        .unwrap();

        let global = GlobalArgs {
            config: Some(file.path().display().to_string()),
            consul_host: Some("consul.flag".to_string()),
            ..GlobalArgs::default()
        };
        let settings = load_settings(&global).unwrap();

        assert_eq!(settings.discovery.consul_host, "consul.flag");
        assert_eq!(settings.discovery.consul_port, 8600);
        assert_eq!(settings.discovery.service_cache_ttl_secs, 12);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let global = GlobalArgs {
            config: Some("/nonexistent/meridian.toml".to_string()),
            ..GlobalArgs::default()
        };
        assert!(load_settings(&global).is_err());
    }
}
