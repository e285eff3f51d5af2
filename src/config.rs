//! Configuration for the callback engine.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default cap on handlers in a single declaration.
pub const DEFAULT_MAX_CHAIN_LEN: usize = 64;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Callback engine configuration.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Maximum handlers per declaration (`CALLBACKS_MAX_CHAIN_LEN`).
    pub max_chain_len: usize,
    /// Manifest to load entity declarations from (`CALLBACKS_MANIFEST`).
    pub manifest_path: Option<PathBuf>,
    /// Log output format (`CALLBACKS_LOG_FORMAT`).
    pub log_format: LogFormat,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            max_chain_len: DEFAULT_MAX_CHAIN_LEN,
            manifest_path: None,
            log_format: LogFormat::Text,
        }
    }
}

impl CallbackConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let max_chain_len = parse_optional_env("CALLBACKS_MAX_CHAIN_LEN", DEFAULT_MAX_CHAIN_LEN)?;
        if max_chain_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CALLBACKS_MAX_CHAIN_LEN".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            max_chain_len,
            manifest_path: optional_env("CALLBACKS_MANIFEST")?.map(PathBuf::from),
            log_format: parse_optional_env("CALLBACKS_LOG_FORMAT", LogFormat::Text)?,
        })
    }
}

// Helper functions

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
