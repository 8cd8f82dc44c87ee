//! `read_file` - return a workspace file's content to the model.

use crate::{parse_args, Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use toolbridge_sandbox::SandboxError;
use tracing::warn;

/// Files that may hold secrets, including the bridge's own API key.
const SENSITIVE_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".env.staging",
    ".env.test",
    "credentials.json",
    "secrets.json",
    "secrets.yaml",
    "secrets.yml",
    "toolbridge.json",
    ".npmrc",
    ".pypirc",
    ".netrc",
    ".aws/credentials",
    ".ssh/id_rsa",
    ".ssh/id_ed25519",
    ".ssh/id_dsa",
];

/// Extensions of private key and keystore files.
const SENSITIVE_EXTENSIONS: &[&str] = &["pem", "key", "p12", "pfx", "jks", "keystore"];

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    #[serde(default)]
    path: String,
}

/// Read a file relative to the workspace root.
pub struct ReadFileTool;

impl Tool for ReadFileTool {
    fn id(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace. The path is relative to the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file relative to the workspace root"
                }
            }
        })
    }

    fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let args: ReadFileArgs = parse_args(args)?;
        if args.path.trim().is_empty() {
            return Err(ToolError::validation("path is required"));
        }

        let sandbox = &ctx.sandbox;
        let resolved = sandbox.resolve(&args.path)?;
        let relative = sandbox.relative(&resolved);

        if is_sensitive_file(Path::new(&relative)) {
            warn!(path = %relative, "Refused to read sensitive file");
            return Err(ToolError::permission_denied(format!(
                "{relative} may contain secrets or credentials and cannot be read"
            )));
        }

        let content = match sandbox.read_bounded(&resolved, ctx.limits.max_file_bytes) {
            Ok(content) => content,
            Err(SandboxError::TooLarge { size, limit, .. }) => {
                return Ok(ToolOutput::truncated(format!(
                    "File {relative} is too large to read ({size} bytes, limit {limit} bytes). \
                     Ask about a smaller file or a specific part of this one."
                )));
            }
            Err(SandboxError::Binary { size, .. }) => {
                return Ok(ToolOutput::new(format!(
                    "[Binary file: {relative}, {size} bytes]\n\n\
                     This file appears to be binary and cannot be displayed as text."
                )));
            }
            Err(SandboxError::NotFound(_)) => {
                let mut message = relative.clone();
                if let Some(suggestion) = suggest_similar_file(&resolved, sandbox.root()) {
                    message.push_str(&format!("\n\nDid you mean: {suggestion}"));
                }
                return Err(ToolError::file_not_found(message));
            }
            Err(SandboxError::NotAFile(_)) => {
                return Err(ToolError::validation(format!(
                    "{relative} is not a file; use list_directory to see its contents"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ToolOutput::new(format_file(&relative, &content)))
    }
}

/// Render file content with its path and line count in a fenced block.
fn format_file(relative: &str, content: &str) -> String {
    let lines = content.lines().count();
    let lang = Path::new(relative)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let body = content.strip_suffix('\n').unwrap_or(content);

    format!("File: {relative} ({lines} lines)\n```{lang}\n{body}\n```")
}

/// Check if a workspace-relative path names a sensitive file.
fn is_sensitive_file(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    let path_str = path.to_string_lossy().replace('\\', "/");

    let listed = SENSITIVE_FILES.iter().any(|pattern| {
        name == *pattern || path_str == *pattern || path_str.ends_with(&format!("/{pattern}"))
    });

    let key_file = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SENSITIVE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false);

    listed || key_file
}

/// Suggest a similarly named sibling when the requested file doesn't exist.
fn suggest_similar_file(path: &Path, root: &Path) -> Option<String> {
    let parent = path.parent()?;
    let filename = path.file_name()?.to_string_lossy().to_lowercase();
    let entries = std::fs::read_dir(parent).ok()?;

    let mut best_match: Option<(String, usize)> = None;

    for entry in entries.flatten() {
        let entry_name = entry.file_name().to_string_lossy().to_string();
        let lowered = entry_name.to_lowercase();

        let similarity = filename
            .chars()
            .zip(lowered.chars())
            .filter(|(a, b)| a == b)
            .count();
        let len_diff = filename.len().abs_diff(lowered.len());
        let score = similarity.saturating_sub(len_diff);

        if score > filename.len() / 3 && best_match.as_ref().map_or(true, |(_, best)| score > *best)
        {
            best_match = Some((entry_name, score));
        }
    }

    best_match.map(|(name, _)| {
        toolbridge_util::path::display_relative(&parent.join(name), root)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolLimits, WorkspaceContext};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, ToolContext) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/Main.java"),
            "public class Main {\n  public static void main(String[] a) {}\n}\n",
        )
        .unwrap();
        let ctx = ToolContext::new(&WorkspaceContext::new(dir.path()), ToolLimits::default())
            .unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_read_file_schema() {
        let schema = ReadFileTool.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["path"]));
        assert!(schema["properties"]["path"].is_object());
    }

    #[test]
    fn test_read_file_formats_content() {
        let (_dir, ctx) = setup();
        let output = ReadFileTool
            .execute(&json!({ "path": "src/Main.java" }), &ctx)
            .unwrap();

        assert!(!output.truncated);
        assert!(output.text.starts_with("File: src/Main.java (3 lines)\n```java\n"));
        assert!(output.text.contains("public class Main {"));
        assert!(output.text.ends_with("}\n```"));
    }

    #[test]
    fn test_read_file_traversal_denied() {
        let (_dir, ctx) = setup();
        let err = ReadFileTool
            .execute(&json!({ "path": "../../etc/passwd" }), &ctx)
            .unwrap_err();
        assert!(matches!(err, ToolError::Sandbox(SandboxError::AccessDenied { .. })));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_read_file_too_large_is_truncated_hint() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(64)).unwrap();
        let limits = ToolLimits {
            max_file_bytes: 16,
            ..Default::default()
        };
        let ctx = ToolContext::new(&WorkspaceContext::new(dir.path()), limits).unwrap();

        let output = ReadFileTool
            .execute(&json!({ "path": "big.txt" }), &ctx)
            .unwrap();
        assert!(output.truncated);
        assert!(output.text.contains("too large"));
        assert!(output.text.contains("64 bytes"));
        assert!(!output.text.contains("xxxx"));
    }

    #[test]
    fn test_read_file_binary() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join("Main.class"), b"\xCA\xFE\xBA\xBE\x00\x00").unwrap();
        let output = ReadFileTool
            .execute(&json!({ "path": "Main.class" }), &ctx)
            .unwrap();
        assert!(output.text.starts_with("[Binary file: Main.class, 6 bytes]"));
    }

    #[test]
    fn test_read_file_not_found_suggests_sibling() {
        let (_dir, ctx) = setup();
        let err = ReadFileTool
            .execute(&json!({ "path": "src/main.java" }), &ctx)
            .unwrap_err();
        let message = err.to_string();
        // Case-insensitive filesystems find the file directly.
        if let ToolError::FileNotFound(_) = err {
            assert!(message.contains("Did you mean: src/Main.java"));
        }
    }

    #[test]
    fn test_read_file_directory() {
        let (_dir, ctx) = setup();
        let err = ReadFileTool
            .execute(&json!({ "path": "src" }), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("list_directory"));
    }

    #[test]
    fn test_read_file_sensitive() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join(".env"), "GEMINI_API_KEY=secret").unwrap();
        let err = ReadFileTool
            .execute(&json!({ "path": "src/../.env" }), &ctx)
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
        assert!(!err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_read_file_empty_path() {
        let (_dir, ctx) = setup();
        let err = ReadFileTool.execute(&json!({ "path": " " }), &ctx).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_is_sensitive_file() {
        assert!(is_sensitive_file(Path::new(".env")));
        assert!(is_sensitive_file(Path::new("config/.env.local")));
        assert!(is_sensitive_file(Path::new("home/.ssh/id_rsa")));
        assert!(is_sensitive_file(Path::new("certs/server.PEM")));
        assert!(!is_sensitive_file(Path::new("src/Environment.java")));
        assert!(!is_sensitive_file(Path::new("docs/env.md")));
    }
}
