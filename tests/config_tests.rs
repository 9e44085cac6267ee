//! Router configuration loading and logging setup
//!
//! # Test Coverage
//!
//! - YAML and TOML files, partial files falling back to defaults
//! - Unsupported extensions and malformed files
//! - `SWITCHYARD_*` overrides through an injected lookup
//! - Logging configuration from variables

use std::collections::HashMap;
use std::io::Write;

use switchyard::otel::{LogConfig, LogFormat};
use switchyard::runtime_config::{ConfigError, RouterConfig};
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = RouterConfig::default();
    assert!(!config.normalize_path);
    assert!(!config.synthesize_options);
    assert!(config.reset_headers_on_error);
    assert_eq!(config.environment, "dev");
    assert_eq!(config.negotiation_cache_capacity, 256);
}

#[test]
fn test_load_yaml() {
    let file = config_file(
        ".yaml",
        "normalize_path: true\nsynthesize_options: true\nenvironment: prod\n",
    );
    let config = RouterConfig::load(file.path()).unwrap();
    assert!(config.normalize_path);
    assert!(config.synthesize_options);
    assert_eq!(config.environment, "prod");
    assert!(config.reset_headers_on_error);
}

#[test]
fn test_load_toml() {
    let file = config_file(
        ".toml",
        "reset_headers_on_error = false\nnegotiation_cache_capacity = 0\n",
    );
    let config = RouterConfig::load(file.path()).unwrap();
    assert!(!config.reset_headers_on_error);
    assert_eq!(config.negotiation_cache_capacity, 0);
    assert_eq!(config.environment, "dev");
}

#[test]
fn test_load_errors() {
    let file = config_file(".json", "{}");
    assert!(matches!(
        RouterConfig::load(file.path()),
        Err(ConfigError::UnsupportedFormat { .. })
    ));

    let file = config_file(".yml", "normalize_path: [not, a, bool]\n");
    assert!(matches!(
        RouterConfig::load(file.path()),
        Err(ConfigError::Yaml { .. })
    ));

    let file = config_file(".toml", "normalize_path = \n");
    assert!(matches!(
        RouterConfig::load(file.path()),
        Err(ConfigError::Toml { .. })
    ));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    let err = RouterConfig::load(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_load_with_env_wraps_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = RouterConfig::load_with_env(dir.path().join("router.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("loading router config"));
}

#[test]
fn test_overrides() {
    let config = RouterConfig::default().with_overrides(lookup(&[
        ("SWITCHYARD_NORMALIZE_PATH", "yes"),
        ("SWITCHYARD_SYNTHESIZE_OPTIONS", "1"),
        ("SWITCHYARD_RESET_HEADERS_ON_ERROR", "off"),
        ("SWITCHYARD_ENV", " staging "),
        ("SWITCHYARD_NEGOTIATION_CACHE", "64"),
    ]));
    assert_eq!(
        config,
        RouterConfig {
            normalize_path: true,
            synthesize_options: true,
            reset_headers_on_error: false,
            environment: "staging".to_string(),
            negotiation_cache_capacity: 64,
        }
    );
}

#[test]
fn test_unparseable_overrides_keep_defaults() {
    let config = RouterConfig::default().with_overrides(lookup(&[
        ("SWITCHYARD_NORMALIZE_PATH", "maybe"),
        ("SWITCHYARD_NEGOTIATION_CACHE", "lots"),
        ("SWITCHYARD_ENV", "   "),
    ]));
    assert_eq!(config, RouterConfig::default());
}

#[test]
fn test_log_config_from_lookup() {
    let config = LogConfig::from_lookup(lookup(&[
        ("SWITCHYARD_LOG_LEVEL", "debug"),
        ("SWITCHYARD_LOG_FORMAT", "pretty"),
    ]));
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.format, LogFormat::Pretty);
}
