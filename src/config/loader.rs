//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };
    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML file without applying environment overrides or validation.
pub fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay recognised environment variables on top of `config`.
///
/// `lookup` abstracts `std::env::var` so tests do not touch the process environment.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "PORT",
            value: port.clone(),
        })?;
    }

    if let Some(env) = lookup("NODE_ENV") {
        config.server.environment = match Environment::parse(&env) {
            Some(parsed) => parsed,
            None => {
                tracing::warn!(value = %env, "Unrecognised NODE_ENV, falling back to development");
                Environment::Development
            }
        };
    }

    if let Some(origins) = lookup("CORS_ORIGIN") {
        config.cors.origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();
    }

    if let Some(url) = lookup("SUPABASE_URL") {
        config.upstream.supabase_url = url.trim().trim_end_matches('/').to_string();
    }

    if let Some(key) = lookup("SUPABASE_ANON_KEY") {
        config.upstream.supabase_anon_key = key.trim().to_string();
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level.trim().to_lowercase();
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = match format.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    name: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }

    Ok(config)
}
