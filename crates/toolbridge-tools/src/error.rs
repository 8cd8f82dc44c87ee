//! Tool error types.

use thiserror::Error;
use toolbridge_sandbox::SandboxError;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool execution.
///
/// These never reach the orchestration loop as errors; the registry renders
/// them as text for the model.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid parameters.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Sandbox rejected or failed the operation.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a file not found error.
    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::FileNotFound(message.into())
    }
}
