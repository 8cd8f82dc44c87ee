//! Tools the model can call through toolbridge.
//!
//! Every tool runs against a [`Sandbox`] rooted at the request's workspace and
//! produces plain text. Failures are reported to the model as text by
//! [`ToolRegistry::execute`], never as errors to the caller.

pub mod error;
pub mod registry;

pub mod list;
pub mod read;
pub mod search;

pub use error::{ToolError, ToolResult};
pub use registry::ToolRegistry;

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolbridge_sandbox::Sandbox;

/// Workspace a single request operates in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    /// Directory all tool access is confined to.
    pub root: PathBuf,
    /// File the user currently has open, if any.
    pub current_file: Option<PathBuf>,
}

impl WorkspaceContext {
    /// Create a context rooted at `root` with no current file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current_file: None,
        }
    }

    /// Set the current file.
    pub fn with_current_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.current_file = Some(file.into());
        self
    }
}

/// Size and count limits applied by the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLimits {
    /// Largest file `read_file` will return.
    pub max_file_bytes: u64,
    /// Maximum matches returned by `search_files`.
    pub search_result_limit: usize,
    /// Maximum entries returned by `list_directory`.
    pub list_limit: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 100 * 1024,
            search_result_limit: 20,
            list_limit: 200,
        }
    }
}

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Sandbox rooted at the workspace.
    pub sandbox: Sandbox,
    /// Limits for this request.
    pub limits: ToolLimits,
}

impl ToolContext {
    /// Build a tool context for a workspace.
    pub fn new(workspace: &WorkspaceContext, limits: ToolLimits) -> ToolResult<Self> {
        Ok(Self {
            sandbox: Sandbox::new(&workspace.root)?,
            limits,
        })
    }
}

/// Result of tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub text: String,
    /// Whether the text omits part of what was asked for.
    pub truncated: bool,
}

impl ToolOutput {
    /// Create a complete tool output.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: false,
        }
    }

    /// Create an output that only covers part of the request.
    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: true,
        }
    }
}

/// The main trait for tools.
///
/// Tool execution is local, synchronous file I/O bounded by [`ToolLimits`].
pub trait Tool: Send + Sync {
    /// Get the tool ID (the function name the model calls).
    fn id(&self) -> &str;

    /// Get the tool description (for the AI).
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool.
    fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<ToolOutput>;
}

/// A shared tool for dynamic dispatch.
pub type BoxedTool = Arc<dyn Tool>;

/// Parse tool arguments into a typed struct.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> ToolResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| ToolError::validation(e.to_string()))
}
