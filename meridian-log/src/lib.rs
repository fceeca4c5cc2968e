//! Meridian Logging
//!
//! Installs the process-wide `tracing` subscriber used by Meridian services.
//! Library crates in the workspace only emit events through `tracing`; this
//! crate decides where and how they are written.
//!
//! # Usage
//!
//! ```rust,no_run
//! use meridian_log::{Format, Level, LogConfig};
//!
//! // Read MERIDIAN_LOG_* from the environment
//! meridian_log::init_from_env().ok();
//!
//! // Or configure explicitly
//! let config = LogConfig::new(Level::Debug, Format::Pretty);
//! meridian_log::try_init(&config).ok();
//! ```
//!
//! # Environment Variables
//!
//! - `MERIDIAN_DEBUG=1` - Enable debug logging
//! - `MERIDIAN_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `MERIDIAN_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `MERIDIAN_LOG_COLOR=1|0` - Enable/disable colors
//! - `MERIDIAN_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `RUST_LOG` - Full filter directive, overrides the level when set

use std::env;
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, fmt};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// A global subscriber was already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),

    /// The filter directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for Meridian logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target (module path)
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            timestamps: true,
            module_path: true,
        }
    }
}

impl LogConfig {
    /// Create a config with the given level and format.
    pub fn new(level: Level, format: Format) -> Self {
        Self {
            level,
            format,
            color: format != Format::Json && color_supported(),
            ..Default::default()
        }
    }

    /// Create a config from level and format names, falling back to the
    /// defaults for names that do not parse.
    pub fn from_names(level: &str, format: &str) -> Self {
        let defaults = Self::default();
        Self::new(
            Level::parse(level).unwrap_or(defaults.level),
            Format::parse(format).unwrap_or(defaults.format),
        )
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("MERIDIAN_DEBUG").unwrap_or(false);

        let level = env::var("MERIDIAN_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("MERIDIAN_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = env_flag("MERIDIAN_LOG_COLOR")
            .unwrap_or(format != Format::Json && color_supported());

        let timestamps = env_flag("MERIDIAN_LOG_TIMESTAMPS").unwrap_or(true);
        let module_path = env_flag("MERIDIAN_LOG_MODULE").unwrap_or(true);

        Self {
            level,
            format,
            color,
            timestamps,
            module_path,
        }
    }

    /// Enable or disable colors.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Enable or disable timestamps.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Filter directive equivalent to this config's level.
    pub fn filter_directive(&self) -> String {
        self.level.as_str().to_string()
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.filter_directive())
                .map_err(|e| LogError::InvalidFilter(e.to_string())),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let target = self.module_path;
        let ansi = self.color;

        match self.format {
            Format::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_ansi(ansi)
                    .with_target(target)
                    .with_writer(std::io::stderr);
                if self.timestamps {
                    layer.boxed()
                } else {
                    layer.without_time().boxed()
                }
            }
            Format::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_target(target)
                    .with_writer(std::io::stderr);
                if self.timestamps {
                    layer.boxed()
                } else {
                    layer.without_time().boxed()
                }
            }
            #[cfg(feature = "json")]
            Format::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_target(target)
                    .with_current_span(true)
                    .with_writer(std::io::stderr);
                if self.timestamps {
                    layer.boxed()
                } else {
                    layer.without_time().boxed()
                }
            }
            #[cfg(not(feature = "json"))]
            Format::Json => fmt::layer()
                .compact()
                .with_ansi(false)
                .with_target(target)
                .with_writer(std::io::stderr)
                .boxed(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Color detection fallback when not configured explicitly.
fn color_supported() -> bool {
    env::var("NO_COLOR").is_err() && env::var("TERM").is_ok()
}

// ============================================================================
// Public API
// ============================================================================

/// Install the global subscriber described by `config`.
///
/// Fails if a subscriber is already installed for this process.
pub fn try_init(config: &LogConfig) -> Result<(), LogError> {
    let filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}

/// Like [`try_init`], but an already installed subscriber is kept and not
/// reported as an error.
pub fn init(config: &LogConfig) -> Result<(), LogError> {
    match try_init(config) {
        Err(LogError::AlreadyInitialized(_)) => Ok(()),
        other => other,
    }
}

/// Install the global subscriber using `MERIDIAN_LOG_*` variables.
pub fn init_from_env() -> Result<(), LogError> {
    try_init(&LogConfig::from_env())
}

// ============================================================================
// Tests
// ============================================================================
