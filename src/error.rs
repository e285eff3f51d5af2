//! Error types for the callback dispatch engine.

use std::path::PathBuf;

use crate::callbacks::hook_point::{EntityKind, HookPoint};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by normalisation, chain execution and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid callback declaration: {reason}")]
    Declaration { reason: String },

    /// The handler's own error, untouched.
    #[error(transparent)]
    Handler(anyhow::Error),

    #[error("Hook point {point} is not exposed by {kind} entities")]
    InvalidHookPoint { point: HookPoint, kind: EntityKind },

    #[error("Context payload '{payload}' cannot be dispatched at {point}")]
    ContextMismatch {
        point: HookPoint,
        payload: &'static str,
    },

    #[error("Dispatch at {point} cancelled after {invoked} handler(s)")]
    Cancelled { point: HookPoint, invoked: usize },

    #[error("A plugin is already registered at {point}: {existing}")]
    PluginConflict { point: HookPoint, existing: String },
}

impl DispatchError {
    pub(crate) fn declaration(reason: impl Into<String>) -> Self {
        DispatchError::Declaration {
            reason: reason.into(),
        }
    }

    /// Borrow the handler error, if this is one.
    pub fn as_handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
