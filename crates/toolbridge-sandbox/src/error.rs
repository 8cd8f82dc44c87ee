//! Error types for sandbox operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The path resolves outside the workspace root.
    #[error("access denied: '{path}' is outside the workspace")]
    AccessDenied { path: String },

    /// The file exceeds the readable size limit.
    #[error("file '{path}' is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// The file looks like binary data.
    #[error("file '{path}' is binary ({size} bytes)")]
    Binary { path: PathBuf, size: u64 },

    /// Nothing exists at the path.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// Expected a regular file.
    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Create an access denied error.
    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied { path: path.into() }
    }

    /// Check if this error is a containment violation.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
