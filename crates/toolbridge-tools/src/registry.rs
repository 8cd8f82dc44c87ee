//! Tool registry.

use crate::{BoxedTool, ToolContext, ToolOutput};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the built-in workspace tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::read::ReadFileTool));
        registry.register(Arc::new(crate::list::ListDirectoryTool));
        registry.register(Arc::new(crate::search::SearchFilesTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.id().to_string(), tool);
    }

    /// Get a tool by ID.
    pub fn get(&self, id: &str) -> Option<&BoxedTool> {
        self.tools.get(id)
    }

    /// All tools, ordered by ID.
    pub fn all(&self) -> Vec<&BoxedTool> {
        let mut tools: Vec<&BoxedTool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.id().cmp(b.id()));
        tools
    }

    /// Run a tool by name, always producing text for the model.
    ///
    /// Unknown names and tool failures are rendered as descriptive text so
    /// the conversation can continue.
    pub fn execute(&self, name: &str, args: &Value, ctx: &ToolContext) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Model called unknown function");
            return ToolOutput::new(format!("Unknown function: {name}"));
        };

        match tool.execute(args, ctx) {
            Ok(output) => {
                info!(
                    tool = %name,
                    bytes = output.text.len(),
                    truncated = output.truncated,
                    "Tool executed"
                );
                output
            }
            Err(e) => {
                debug!(tool = %name, error = %e, "Tool failed");
                ToolOutput::new(format!("Error: {e}"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
