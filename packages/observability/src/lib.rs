//! # Observability
//!
//! Logging setup shared by the weather relay binaries.
//!
//! Services call [`init_with_config`] once at startup and then use the
//! standard `tracing` macros with structured fields. Where the lines end up
//! is decided here, not at the call sites:
//!
//! - `LogFormat::Compact`: human-readable lines on stderr (default).
//! - `LogFormat::Json`: one JSON object per line on stdout, suitable for
//!   container log collectors.
//! - `log_path`: an additional append-only JSONL file, independent of the
//!   console format.
//!
//! `RUST_LOG` always takes precedence over `LogConfig::default_level`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "weather-relay".into(),
//!     default_level: "debug".into(),
//!     ..Default::default()
//! })?;
//! tracing::info!("ready");
//! ```

mod json_layer;
mod log_file;

use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLayer, LogEntry};
pub use log_file::{LogFile, LogLine};

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines on stderr.
    #[default]
    Compact,
    /// JSON lines on stdout.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected compact or json)")),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSON line.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "weather_relay=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    /// Console output format.
    pub format: LogFormat,

    /// Optional JSONL file that receives a copy of every event.
    pub log_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
        }
    }
}

/// Initialize logging with custom configuration.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let compact_layer = (config.format == LogFormat::Compact).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(filter())
    });

    let json_layer = (config.format == LogFormat::Json).then(|| {
        JsonLayer::new(config.service_name.clone(), io::stdout as fn() -> io::Stdout)
            .with_filter(filter())
    });

    let file_layer = match config.log_path.as_deref() {
        Some(path) => Some(
            JsonLayer::new(config.service_name.clone(), LogFile::open(path)?)
                .with_filter(filter()),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(compact_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    if let Some(path) = &config.log_path {
        tracing::debug!(log_path = %path.display(), "file logging enabled");
    }

    Ok(())
}
