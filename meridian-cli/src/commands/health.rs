//! Health commands: probe one endpoint, or sweep every registered service.

use colored::Colorize;
use meridian_discovery::HealthChecker;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

use super::open_context;
use crate::GlobalArgs;
use crate::error::{CliError, CliResult};
use crate::output;

/// Probe `url` once. Exits non-zero unless it answers 200.
pub async fn probe(global: &GlobalArgs, url: &str, timeout_secs: f64) -> CliResult<()> {
    let timeout = Duration::try_from_secs_f64(timeout_secs)
        .ok()
        .filter(|timeout| !timeout.is_zero())
        .ok_or_else(|| {
            CliError::InvalidArgument(format!("timeout must be positive, got {}", timeout_secs))
        })?;

    let context = open_context(global)?;
    let checker = HealthChecker::with_timeout(context.discovery()?, timeout)?;
    let healthy = checker.check_endpoint(url).await;
    context.close().await;

    if global.json {
        output::json(&json!({"url": url, "healthy": healthy}))?;
    } else {
        println!("  {} {}", url.cyan(), output::status(healthy));
    }

    if healthy {
        Ok(())
    } else {
        Err(CliError::Failed(format!("{} is unhealthy", url)))
    }
}

/// Probe every registered service once. Exits non-zero if any is unhealthy.
pub async fn sweep(global: &GlobalArgs) -> CliResult<()> {
    let context = open_context(global)?;
    let results: BTreeMap<String, bool> = context
        .health_checker()?
        .check_all_services()
        .await
        .into_iter()
        .collect();
    context.close().await;

    let unhealthy: Vec<&str> = results
        .iter()
        .filter(|(_, healthy)| !**healthy)
        .map(|(name, _)| name.as_str())
        .collect();

    if global.json {
        output::json(&results)?;
    } else if results.is_empty() {
        output::warn("No services registered");
    } else {
        output::header("Service health");
        let rows: Vec<Vec<String>> = results
            .iter()
            .map(|(name, healthy)| vec![name.clone(), output::status(*healthy)])
            .collect();
        println!("{}", output::table(&["SERVICE", "STATUS"], &rows));
        println!();
    }

    if unhealthy.is_empty() {
        Ok(())
    } else {
        Err(CliError::Failed(format!(
            "Unhealthy services: {}",
            unhealthy.join(", ")
        )))
    }
}
