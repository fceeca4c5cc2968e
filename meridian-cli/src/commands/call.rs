//! Call a service by name.

use colored::Colorize;
use meridian_http_client::Method;
use serde_json::json;

use super::open_context;
use crate::error::{CliError, CliResult};
use crate::{CallArgs, GlobalArgs, output};

pub async fn run(global: &GlobalArgs, args: CallArgs) -> CliResult<()> {
    let method = parse_method(&args.method)?;
    let headers = args
        .headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<CliResult<Vec<_>>>()?;
    let body = args
        .data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| CliError::InvalidArgument(format!("--data is not valid JSON: {}", e)))?;

    let context = open_context(global)?;
    let services = context.service_client()?;

    let mut request = services.request(args.service.as_str(), method.clone(), args.path.as_str());
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    if let Some(body) = &body {
        request = request.json(body);
    }

    let result = request.send().await;
    context.close().await;
    let response = result?;

    let status = response.status();
    let text = response.text()?;

    if global.json {
        let body = serde_json::from_str::<serde_json::Value>(&text).unwrap_or(json!(text));
        output::json(&json!({
            "service": args.service,
            "method": method.as_str(),
            "url": response.url().as_str(),
            "status": status.as_u16(),
            "body": body,
        }))?;
    } else {
        let status_line = status.to_string();
        let status_line = if status.is_success() {
            status_line.green()
        } else {
            status_line.red()
        };
        println!("  {} {} {}", method.as_str().bold(), response.url(), status_line);
        if !text.is_empty() {
            println!();
            println!("{}", text);
        }
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(CliError::Failed(format!("{} answered {}", args.service, status)))
    }
}

fn parse_method(raw: &str) -> CliResult<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidArgument(format!("invalid HTTP method {:?}", raw)))
}

fn parse_header(raw: &str) -> CliResult<(String, String)> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| CliError::InvalidArgument(format!("header must be \"Name: value\", got {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("DELETE").unwrap(), Method::DELETE);
        assert!(parse_method("NOT A METHOD").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Caller:  gateway ").unwrap(),
            ("X-Caller".to_string(), "gateway".to_string())
        );
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap().1,
            "Bearer a:b"
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }
}
