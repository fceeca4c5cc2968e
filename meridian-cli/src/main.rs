//! Meridian CLI - operator tools for Meridian service discovery.
//!
//! # Commands
//!
//! - `meridian services` - List registered services and their tags
//! - `meridian discover <name>` - List passing instances of a service
//! - `meridian register` - Register a service instance
//! - `meridian deregister <id>` - Remove a service instance
//! - `meridian checks <id>` - Show registry health checks of an instance
//! - `meridian probe <url>` - Probe a health endpoint directly
//! - `meridian health` - Probe every registered service once
//! - `meridian call <service> <path>` - Call a service by name

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

mod commands;
mod error;
mod output;

use commands::{call, health, registry};
use error::{CliError, CliResult};

/// Meridian CLI - service discovery operator tools
#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(version)]
#[command(about = "Inspect and operate Meridian service discovery")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} meridian services\n  {} meridian discover orders --json\n  {} meridian register --name orders --address 10.0.0.4 --port 9000 --tag v1\n  {} meridian call orders /orders/42",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (TOML, JSON or .env)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Registry agent host, overriding the configuration
    #[arg(long, global = true)]
    pub consul_host: Option<String>,

    /// Registry agent port, overriding the configuration
    #[arg(long, global = true)]
    pub consul_port: Option<u16>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered services and their tags
    #[command(alias = "ls")]
    Services,

    /// List passing instances of a service
    #[command(alias = "d")]
    Discover {
        /// Service name
        name: String,
    },

    /// Register a service instance
    Register(RegisterArgs),

    /// Deregister a service instance
    Deregister {
        /// Service instance id
        id: String,
    },

    /// Show registry health checks of a service instance
    Checks {
        /// Service instance id
        id: String,
    },

    /// Probe a health endpoint directly
    Probe {
        /// Endpoint URL; `/health` is used when no path is given
        url: String,

        /// Probe timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: f64,
    },

    /// Probe every registered service once
    Health,

    /// Call a service by name through the retrying client
    Call(CallArgs),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Service name
    #[arg(short, long)]
    pub name: String,

    /// Instance id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Address other services use to reach the instance
    #[arg(short, long)]
    pub address: String,

    /// Instance port
    #[arg(short, long)]
    pub port: u16,

    /// Tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Metadata as KEY=VALUE (repeatable)
    #[arg(short, long = "meta")]
    pub meta: Vec<String>,

    /// Health check URL (defaults to http://ADDRESS:PORT/health)
    #[arg(long)]
    pub check_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Service name
    pub service: String,

    /// Request path, e.g. /orders/42
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.global.no_color || cli.global.json {
        colored::control::set_override(false);
    }

    let level = if cli.global.verbose { "debug" } else { "warn" };
    let log_config = meridian_log::LogConfig::from_names(level, "compact")
        .with_color(!cli.global.no_color)
        .with_timestamps(false);
    if let Err(e) = meridian_log::init(&log_config) {
        output::warn(&format!("Logging disabled: {}", e));
    }

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let global = cli.global;

    match cli.command {
        Commands::Services => registry::services(&global).await,
        Commands::Discover { name } => registry::discover(&global, &name).await,
        Commands::Register(args) => registry::register(&global, args).await,
        Commands::Deregister { id } => registry::deregister(&global, &id).await,
        Commands::Checks { id } => registry::checks(&global, &id).await,
        Commands::Probe { url, timeout } => health::probe(&global, &url, timeout).await,
        Commands::Health => health::sweep(&global).await,
        Commands::Call(args) => call::run(&global, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "meridian", "register", "--name", "orders", "--address", "10.0.0.4", "--port", "9000",
            "--tag", "v1", "--tag", "primary", "--meta", "version=1.0.0",
        ])
        .unwrap();

        match cli.command {
            Commands::Register(args) => {
                assert_eq!(args.name, "orders");
                assert_eq!(args.port, 9000);
                assert_eq!(args.tags, vec!["v1", "primary"]);
                assert_eq!(args.meta, vec!["version=1.0.0"]);
                assert!(args.id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "meridian",
            "discover",
            "orders",
            "--consul-host",
            "consul.internal",
            "--consul-port",
            "8501",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.global.consul_host.as_deref(), Some("consul.internal"));
        assert_eq!(cli.global.consul_port, Some(8501));
        assert!(cli.global.json);
    }

    #[test]
    fn test_call_defaults_to_get() {
        let cli = Cli::try_parse_from(["meridian", "call", "orders", "/orders/42"]).unwrap();

        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.method, "GET");
                assert!(args.data.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_register_requires_port() {
        let result = Cli::try_parse_from([
            "meridian", "register", "--name", "orders", "--address", "10.0.0.4",
        ]);
        assert!(result.is_err());
    }
}
