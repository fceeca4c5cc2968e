//! Registry commands: services, discover, register, deregister, checks.

use colored::Colorize;
use meridian_discovery::{HealthCheckSpec, Registration, RegistryBackend};
use serde_json::json;

use super::open_context;
use crate::error::{CliError, CliResult};
use crate::{GlobalArgs, RegisterArgs, output};

/// List every registered service with its tags.
pub async fn services(global: &GlobalArgs) -> CliResult<()> {
    let context = open_context(global)?;
    let services = context.discovery()?.list_all_services().await;
    context.close().await;

    let mut names: Vec<&String> = services.keys().collect();
    names.sort();

    if global.json {
        let sorted: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .map(|name| ((*name).clone(), json!(services[*name])))
            .collect();
        return output::json(&sorted);
    }

    if names.is_empty() {
        output::warn("No services registered");
        return Ok(());
    }

    output::header("Services");
    let rows: Vec<Vec<String>> = names
        .iter()
        .map(|name| vec![(*name).clone(), services[*name].join(", ")])
        .collect();
    println!("{}", output::table(&["SERVICE", "TAGS"], &rows));
    println!();
    Ok(())
}

/// List the passing instances of one service.
pub async fn discover(global: &GlobalArgs, name: &str) -> CliResult<()> {
    let context = open_context(global)?;
    let instances = context.discovery()?.discover(name).await;
    context.close().await;

    if global.json {
        return output::json(&instances);
    }

    if instances.is_empty() {
        output::warn(&format!("No passing instances of {}", name));
        return Ok(());
    }

    output::header(&format!("Instances of {}", name.cyan()));
    let rows: Vec<Vec<String>> = instances
        .iter()
        .map(|instance| {
            vec![
                instance.service_id.clone(),
                format!("{}:{}", instance.address, instance.port),
                instance.tags.join(", "),
            ]
        })
        .collect();
    println!("{}", output::table(&["ID", "ADDRESS", "TAGS"], &rows));
    println!();
    Ok(())
}

/// Register an instance, printing the id it was registered under.
pub async fn register(global: &GlobalArgs, args: RegisterArgs) -> CliResult<()> {
    let registration = build_registration(args)?;
    let name = registration.name.clone();

    let context = open_context(global)?;
    let registered = context.discovery()?.register_with_id(registration).await;
    context.close().await;

    let Some(service_id) = registered else {
        return Err(CliError::Failed(format!(
            "Registry rejected the registration of {}",
            name
        )));
    };

    if global.json {
        return output::json(&json!({"service": name, "service_id": service_id}));
    }
    output::success(&format!("Registered {} as {}", name, service_id.cyan()));
    Ok(())
}

fn build_registration(args: RegisterArgs) -> CliResult<Registration> {
    let mut registration = Registration::new(args.name, args.address, args.port).with_tags(args.tags);

    if let Some(id) = args.id {
        registration = registration.with_id(id);
    }

    for pair in &args.meta {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| {
                CliError::InvalidArgument(format!("metadata must be KEY=VALUE, got {:?}", pair))
            })?;
        registration = registration.with_meta(key, value);
    }

    if let Some(url) = args.check_url {
        registration = registration.with_check(HealthCheckSpec::http(url));
    }

    Ok(registration)
}

/// Remove an instance from the registry.
pub async fn deregister(global: &GlobalArgs, id: &str) -> CliResult<()> {
    let context = open_context(global)?;
    let removed = context.discovery()?.deregister(id).await;
    context.close().await;

    if !removed {
        return Err(CliError::Failed(format!("Could not deregister {}", id)));
    }

    if global.json {
        return output::json(&json!({"service_id": id, "deregistered": true}));
    }
    output::success(&format!("Deregistered {}", id.cyan()));
    Ok(())
}

/// Show the registry checks of one instance. Fails when any is not passing.
pub async fn checks(global: &GlobalArgs, id: &str) -> CliResult<()> {
    let context = open_context(global)?;
    let discovery = context.discovery()?;
    let checks = discovery.backend().health_checks(id).await;
    context.close().await;

    let checks = checks?;
    let passing = checks.iter().all(|check| check.status.is_passing());

    if global.json {
        output::json(&json!({"service_id": id, "passing": passing, "checks": checks}))?;
    } else if checks.is_empty() {
        output::info(&format!("{} has no registry checks", id));
    } else {
        output::header(&format!("Checks of {}", id.cyan()));
        let rows: Vec<Vec<String>> = checks
            .iter()
            .map(|check| {
                vec![
                    check.check_id.clone(),
                    check.status.as_str().to_string(),
                    check.output.lines().next().unwrap_or_default().to_string(),
                ]
            })
            .collect();
        println!("{}", output::table(&["CHECK", "STATUS", "OUTPUT"], &rows));
        println!();
        println!("  {}", output::status(passing));
    }

    if passing {
        Ok(())
    } else {
        Err(CliError::Failed(format!("{} is not passing", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RegisterArgs {
        RegisterArgs {
            name: "orders".to_string(),
            id: None,
            address: "10.0.0.4".to_string(),
            port: 9000,
            tags: vec!["v1".to_string()],
            meta: vec!["version=1.0.0".to_string(), "owner=team=a".to_string()],
            check_url: None,
        }
    }

    #[test]
    fn test_build_registration() {
        let registration = build_registration(args()).unwrap();

        assert_eq!(registration.name, "orders");
        assert!(registration.id.is_none());
        assert_eq!(registration.tags, vec!["v1".to_string()]);
        assert_eq!(registration.meta["version"], "1.0.0");
        // Only the first '=' separates
        assert_eq!(registration.meta["owner"], "team=a");
        assert!(registration.check.is_none());
    }

    #[test]
    fn test_build_registration_with_id_and_check() {
        let mut args = args();
        args.id = Some("orders-1".to_string());
        args.check_url = Some("http://10.0.0.4:9000/ready".to_string());

        let registration = build_registration(args).unwrap();

        assert_eq!(registration.id.as_deref(), Some("orders-1"));
        assert_eq!(
            registration.check,
            Some(HealthCheckSpec::http("http://10.0.0.4:9000/ready"))
        );
    }

    #[test]
    fn test_build_registration_rejects_bad_meta() {
        let mut no_value = args();
        no_value.meta = vec!["novalue".to_string()];
        assert!(matches!(
            build_registration(no_value),
            Err(CliError::InvalidArgument(_))
        ));

        let mut no_key = args();
        no_key.meta = vec!["=x".to_string()];
        assert!(build_registration(no_key).is_err());
    }
}
