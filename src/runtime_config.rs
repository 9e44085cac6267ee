//! # Runtime Configuration Module
//!
//! Router-wide options, loaded from environment variables or a YAML/TOML
//! file.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `SWITCHYARD_NORMALIZE_PATH` | `normalize_path` | `false` |
//! | `SWITCHYARD_SYNTHESIZE_OPTIONS` | `synthesize_options` | `false` |
//! | `SWITCHYARD_RESET_HEADERS_ON_ERROR` | `reset_headers_on_error` | `true` |
//! | `SWITCHYARD_ENV` | `environment` | `dev` |
//! | `SWITCHYARD_NEGOTIATION_CACHE` | `negotiation_cache_capacity` | `256` |
//!
//! Booleans accept `true/false/1/0/yes/no/on/off`. Unparseable values are
//! logged and the default is kept.
//!
//! ## Files
//!
//! ```yaml
//! normalize_path: true
//! synthesize_options: true
//! environment: prod
//! ```
//!
//! `RouterConfig::load` picks the format from the extension (`.yaml`,
//! `.yml`, `.toml`). Missing fields take their defaults.
//!
//! ## Path normalization
//!
//! By default `//double//slash` patterns and request paths keep their empty
//! segments and match literally, so applications can intercept raw paths.
//! `normalize_path` collapses empty segments on both sides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Router-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Collapse empty path segments in patterns and request paths
    pub normalize_path: bool,
    /// Answer `OPTIONS` with `Allow` when no user route handles it
    pub synthesize_options: bool,
    /// Drop headers staged before a failure when rendering the error
    pub reset_headers_on_error: bool,
    /// Active environment for environment-conditional registration
    pub environment: String,
    /// Maximum parsed-header cache entries; `0` disables the cache
    pub negotiation_cache_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            normalize_path: false,
            synthesize_options: false,
            reset_headers_on_error: true,
            environment: "dev".to_string(),
            negotiation_cache_capacity: 256,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unsupported config file extension for {path}; expected .yaml, .yml or .toml")]
    UnsupportedFormat { path: PathBuf },
}

impl RouterConfig {
    /// Defaults overridden by `SWITCHYARD_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (environment or test map)
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "SWITCHYARD_NORMALIZE_PATH", parse_bool) {
            self.normalize_path = v;
        }
        if let Some(v) = parse_var(&lookup, "SWITCHYARD_SYNTHESIZE_OPTIONS", parse_bool) {
            self.synthesize_options = v;
        }
        if let Some(v) = parse_var(&lookup, "SWITCHYARD_RESET_HEADERS_ON_ERROR", parse_bool) {
            self.reset_headers_on_error = v;
        }
        if let Some(env_name) = lookup("SWITCHYARD_ENV") {
            let env_name = env_name.trim();
            if !env_name.is_empty() {
                self.environment = env_name.to_string();
            }
        }
        if let Some(v) = parse_var(&lookup, "SWITCHYARD_NEGOTIATION_CACHE", |s| {
            s.parse::<usize>().ok()
        }) {
            self.negotiation_cache_capacity = v;
        }
        self
    }

    /// Load from a YAML or TOML file, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let format = match ext.as_deref() {
            Some("yaml" | "yml") => Format::Yaml,
            Some("toml") => Format::Toml,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match format {
            Format::Yaml => serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            }),
            Format::Toml => toml::from_str(&raw).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// File configuration with environment overrides on top
    ///
    /// Application edge helper: errors carry file context for startup logs.
    pub fn load_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path)
            .with_context(|| format!("loading router config from {}", path.display()))?
            .with_overrides(|key| env::var(key).ok());
        info!(
            path = %path.display(),
            environment = %config.environment,
            normalize_path = config.normalize_path,
            synthesize_options = config.synthesize_options,
            "Router configuration loaded"
        );
        Ok(config)
    }
}

enum Format {
    Yaml,
    Toml,
}

fn parse_var<T, L, P>(lookup: &L, key: &str, parse: P) -> Option<T>
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(variable = key, value = %raw, "Ignoring unparseable configuration value");
    }
    parsed
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
