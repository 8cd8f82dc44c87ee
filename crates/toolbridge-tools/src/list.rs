//! `list_directory` - immediate children of a workspace directory.

use crate::{parse_args, Tool, ToolContext, ToolOutput, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use toolbridge_sandbox::SandboxError;

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default)]
    path: String,
}

/// List files and directories in one workspace directory.
pub struct ListDirectoryTool;

impl Tool for ListDirectoryTool {
    fn id(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the files and directories directly inside a workspace directory. \
         Use an empty path for the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory relative to the workspace root (empty for the root)"
                }
            }
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: ListDirectoryArgs = parse_args(args)?;
        let sandbox = &ctx.sandbox;
        let dir = sandbox.resolve(args.path.trim())?;
        let relative = sandbox.relative(&dir);

        if !dir.exists() {
            return Err(SandboxError::NotFound(relative.into()).into());
        }
        if !dir.is_dir() {
            return Err(SandboxError::NotADirectory(relative.into()).into());
        }

        let mut entries: Vec<(String, bool)> = std::fs::read_dir(&dir)?
            .flatten()
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                (name, is_dir)
            })
            .collect();

        entries.sort_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));

        let total = entries.len();
        let limit = ctx.limits.list_limit;
        let truncated = total > limit;

        let mut text = format!("Directory: {relative} ({total} entries)");
        if entries.is_empty() {
            text.push_str("\n(empty)");
        }
        for (name, is_dir) in entries.iter().take(limit) {
            let tag = if *is_dir { "[dir]" } else { "[file]" };
            text.push_str(&format!("\n{tag} {name}"));
        }
        if truncated {
            text.push_str(&format!("\n... ({} more entries not shown)", total - limit));
        }

        Ok(ToolOutput { text, truncated })
    }
}
