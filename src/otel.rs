//! Logging initialization
//!
//! Installs a `tracing_subscriber` registry with an [`EnvFilter`] and either
//! JSON (production) or pretty (development) output. The router itself only
//! emits `tracing` events; applications that already install a subscriber
//! can skip this module entirely.
//!
//! ## Environment Variables
//!
//! - `SWITCHYARD_LOG_LEVEL`: `trace`/`debug`/`info`/`warn`/`error` (default `info`)
//! - `SWITCHYARD_LOG_FORMAT`: `json` or `pretty` (default `json`)
//! - `SWITCHYARD_LOG_INCLUDE_LOCATION`: include `file:line` (default `false`)
//! - `SWITCHYARD_LOG_TARGET_FILTER`: extra comma-separated filter directives
//!
//! `RUST_LOG`, when set, takes precedence over `SWITCHYARD_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Include file:line location (dev only)
    pub include_location: bool,
    /// Extra filter directives, comma-separated (`switchyard::router=debug`)
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
            target_filter: None,
        }
    }
}

impl LogConfig {
    /// Parse configuration from `SWITCHYARD_LOG_*` variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("SWITCHYARD_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("SWITCHYARD_LOG_FORMAT")
                .map_or(defaults.format, |s| LogFormat::parse(&s)),
            include_location: lookup("SWITCHYARD_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.include_location),
            target_filter: lookup("SWITCHYARD_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
        }
    }

    /// Verbose pretty output for local development and tests
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            target_filter: None,
        }
    }

    /// The configured level; unknown names fall back to `INFO`
    #[must_use]
    pub fn level(&self) -> Level {
        match self.log_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Filter from `RUST_LOG` if set, else the configured level, plus any
    /// valid target directives
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("Ignoring invalid log filter directive {directive:?}: {e}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when a global subscriber is already installed, so
/// tests and embedding applications can call this unconditionally.
///
/// ```no_run
/// use switchyard::otel::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env()).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<bool> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(
            level = %config.level(),
            format = ?config.format,
            "Logging initialized"
        );
    }
    Ok(installed)
}

/// Like [`init_logging`], but an already installed subscriber is an error
pub fn init_logging_strict(config: &LogConfig) -> Result<()> {
    if init_logging(config).context("initializing logging")? {
        Ok(())
    } else {
        anyhow::bail!("a global tracing subscriber is already installed")
    }
}
