//! Logging setup using tracing.
//!
//! The bridge runs as a long-lived local server, so logs always go to stderr.
//! `RUST_LOG` takes precedence over the level chosen on the command line.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose targets are covered by the default filter.
const CRATE_TARGETS: &[&str] = &[
    "toolbridge",
    "toolbridge_core",
    "toolbridge_provider",
    "toolbridge_server",
    "toolbridge_tools",
    "toolbridge_sandbox",
];

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Level applied to the toolbridge crates.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Whether to emit ANSI colors.
    pub ansi: bool,
}

impl LogConfig {
    /// Build the default filter directive string for this configuration.
    ///
    /// HTTP request logging from `tower_http` stays at `info` unless the
    /// crates themselves are more verbose.
    pub fn filter_directives(&self) -> String {
        let level = self.level.as_str();
        let http_level = match self.level {
            LogLevel::Trace | LogLevel::Debug => level,
            _ => "info",
        };

        let mut directives: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        directives.push(format!("tower_http={http_level}"));
        directives.join(",")
    }
}

/// Initialize logging with the given configuration.
///
/// This should be called once at application startup.
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(config.ansi)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
