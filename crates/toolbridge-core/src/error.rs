//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Upstream model error.
    #[error("{0}")]
    Provider(#[from] toolbridge_provider::ProviderError),

    /// Tool setup error.
    #[error("tool error: {0}")]
    Tool(#[from] toolbridge_tools::ToolError),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON syntax or shape.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config file could not be read.
    #[error("cannot read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// No provider API key in any source.
    #[error("no API key configured; set GEMINI_API_KEY or add \"api_key\" to toolbridge.json")]
    MissingApiKey,

    /// Workspace root missing or not a directory.
    #[error("invalid workspace root {path}: {message}")]
    InvalidWorkspaceRoot { path: PathBuf, message: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
