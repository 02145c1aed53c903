//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// An environment value that was present but could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ignoring {key}={value:?}: {reason}")]
pub struct ConfigWarning {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// A validated configuration plus anything skipped while building it.
/// Warnings are returned rather than logged: loading runs before the
/// subscriber is installed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ProxyConfig,
    pub warnings: Vec<ConfigWarning>,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, overlay the process
/// environment and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], reading environment values through `lookup`.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    let warnings = apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(LoadedConfig { config, warnings })
}

/// Overlay environment-provided settings. Empty values count as unset;
/// unparsable values are skipped and reported.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Vec<ConfigWarning>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(endpoint) = get("AZURE_API_ENDPOINT") {
        config.upstream.endpoint = endpoint;
    }
    if let Some(version) = get("AZURE_API_VERSION") {
        config.upstream.api_version = version;
    }
    if let Some(key) = get("AZURE_API_KEY") {
        config.upstream.api_key = Some(key);
    }
    if let Some(host) = get("HOST") {
        config.listener.host = host;
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse() {
            Ok(port) => config.listener.port = port,
            Err(e) => warnings.push(ConfigWarning {
                key: "PORT",
                value: port,
                reason: format!("{}", e),
            }),
        }
    }
    if let Some(format) = get("LOG_FORMAT") {
        match format.parse() {
            Ok(parsed) => config.observability.log_format = parsed,
            Err(e) => warnings.push(ConfigWarning {
                key: "LOG_FORMAT",
                value: format,
                reason: format!("{}", e),
            }),
        }
    }
    if let Some(addr) = get("METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = addr;
    }

    warnings
}
