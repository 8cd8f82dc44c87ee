//! `search_files` - find files by name anywhere below a workspace directory.

use crate::{parse_args, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use toolbridge_sandbox::SandboxError;
use toolbridge_util::path::is_hidden_name;
use toolbridge_util::wildcard;
use walkdir::{DirEntry, WalkDir};

/// Build output, dependency and tooling directories that are never searched.
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "target",
    "build",
    "classes",
    "bin",
    "obj",
    "out",
    "dist",
    "vendor",
    "coverage",
    "venv",
    ".git",
    ".svn",
    ".hg",
    ".gradle",
    ".idea",
    ".vscode",
];

#[derive(Debug, Deserialize)]
struct SearchFilesArgs {
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    directory: Option<String>,
}

/// Search file names recursively.
pub struct SearchFilesTool;

impl Tool for SearchFilesTool {
    fn id(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files by name in the workspace. The pattern matches file names \
         case-insensitively as a substring, or as a wildcard pattern when it contains * or ?."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["pattern"],
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Substring or wildcard pattern (e.g. \"Panel\" or \"*.java\")"
                },
                "directory": {
                    "type": "string",
                    "description": "Directory to search from, relative to the workspace root (default: root)"
                }
            }
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: SearchFilesArgs = parse_args(args)?;
        let pattern = args.pattern.trim();
        if pattern.is_empty() {
            return Err(ToolError::validation("pattern is required"));
        }

        let sandbox = &ctx.sandbox;
        let start = sandbox.resolve(args.directory.as_deref().unwrap_or("").trim())?;
        let start_display = sandbox.relative(&start);
        if !start.is_dir() {
            return Err(SandboxError::NotADirectory(start_display.into()).into());
        }

        let limit = ctx.limits.search_result_limit;
        let mut matches = Vec::new();
        let mut truncated = false;

        let walker = WalkDir::new(&start)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_pruned(entry));

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !wildcard::name_matches(pattern, &name) {
                continue;
            }
            if matches.len() == limit {
                truncated = true;
                break;
            }
            matches.push(sandbox.relative(entry.path()));
        }

        if matches.is_empty() {
            return Ok(ToolOutput::new(format!(
                "No files matching '{pattern}' found in {start_display}"
            )));
        }

        let mut text = format!(
            "Found {} files matching '{pattern}' in {start_display}:",
            matches.len()
        );
        for path in &matches {
            text.push('\n');
            text.push_str(path);
        }
        if truncated {
            text.push_str(&format!(
                "\n(showing the first {limit} matches; refine the pattern to narrow the search)"
            ));
        }

        Ok(ToolOutput { text, truncated })
    }
}

/// Whether the walk should skip this entry and everything below it.
fn is_pruned(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    is_hidden_name(&name) || EXCLUDED_DIRS.iter().any(|d| name.eq_ignore_ascii_case(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolLimits, WorkspaceContext};
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn context(dir: &Path, limits: ToolLimits) -> ToolContext {
        ToolContext::new(&WorkspaceContext::new(dir), limits).unwrap()
    }

    #[test]
    fn test_search_substring_recursive() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/ui/AIChatPanel.java");
        touch(dir.path(), "src/ui/TerminalPanel.java");
        touch(dir.path(), "src/Main.java");
        let ctx = context(dir.path(), ToolLimits::default());

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "panel" }), &ctx)
            .unwrap();
        assert_eq!(
            output.text,
            "Found 2 files matching 'panel' in .:\nsrc/ui/AIChatPanel.java\nsrc/ui/TerminalPanel.java"
        );
        assert!(!output.truncated);
    }

    #[test]
    fn test_search_wildcard() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "A.java");
        touch(dir.path(), "A.class");
        touch(dir.path(), "notes.java.txt");
        let ctx = context(dir.path(), ToolLimits::default());

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "*.JAVA" }), &ctx)
            .unwrap();
        assert!(output.text.contains("A.java"));
        assert!(!output.text.contains("A.class"));
        assert!(!output.text.contains("notes.java.txt"));
    }

    #[test]
    fn test_search_prunes_hidden_and_excluded() {
        let dir = tempdir().unwrap();
        touch(dir.path(), ".git/objects/Main.java");
        touch(dir.path(), ".hidden/Main.java");
        touch(dir.path(), "build/classes/Main.java");
        touch(dir.path(), "node_modules/pkg/Main.java");
        touch(dir.path(), "target/Main.java");
        touch(dir.path(), "src/Main.java");
        let ctx = context(dir.path(), ToolLimits::default());

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "Main" }), &ctx)
            .unwrap();
        assert_eq!(output.text, "Found 1 files matching 'Main' in .:\nsrc/Main.java");
    }

    #[test]
    fn test_search_stops_at_limit() {
        let dir = tempdir().unwrap();
        for i in 0..10 {
            touch(dir.path(), &format!("src/File{i}.java"));
        }
        let limits = ToolLimits {
            search_result_limit: 3,
            ..Default::default()
        };
        let ctx = context(dir.path(), limits);

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "file" }), &ctx)
            .unwrap();
        assert!(output.truncated);
        let listed = output.text.lines().filter(|l| l.ends_with(".java")).count();
        assert_eq!(listed, 3);
    }

    #[test]
    fn test_search_in_directory() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a/Main.java");
        touch(dir.path(), "b/Main.java");
        let ctx = context(dir.path(), ToolLimits::default());

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "Main", "directory": "b" }), &ctx)
            .unwrap();
        assert_eq!(output.text, "Found 1 files matching 'Main' in b:\nb/Main.java");
    }

    #[test]
    fn test_search_start_named_like_excluded_dir_is_searched() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "build/Report.txt");
        let ctx = context(dir.path(), ToolLimits::default());

        let output = SearchFilesTool
            .execute(&json!({ "pattern": "report", "directory": "build" }), &ctx)
            .unwrap();
        assert!(output.text.contains("build/Report.txt"));
    }

    #[test]
    fn test_search_no_matches() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "A.java");
        let ctx = context(dir.path(), ToolLimits::default());
        let output = SearchFilesTool
            .execute(&json!({ "pattern": "zzz" }), &ctx)
            .unwrap();
        assert_eq!(output.text, "No files matching 'zzz' found in .");
    }

    #[test]
    fn test_search_requires_pattern() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), ToolLimits::default());
        let err = SearchFilesTool.execute(&json!({}), &ctx).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_search_outside_root_denied() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), ToolLimits::default());
        let err = SearchFilesTool
            .execute(&json!({ "pattern": "x", "directory": "../.." }), &ctx)
            .unwrap_err();
        assert!(matches!(err, ToolError::Sandbox(SandboxError::AccessDenied { .. })));
    }
}
