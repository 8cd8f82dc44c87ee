//! Chat request body and workspace resolution.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use toolbridge_provider::Message;
use toolbridge_tools::WorkspaceContext;
use tracing::{debug, warn};

/// Body of `POST /chat/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

/// One message of the client's conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Optional hints about where the user is working.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub current_file: Option<String>,
}

impl ChatRequest {
    /// Parse a request body.
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        let request: ChatRequest =
            serde_json::from_slice(body).map_err(|e| format!("Invalid request: {e}"))?;
        if request.messages.is_empty() {
            return Err("Invalid request: messages must not be empty".to_string());
        }
        Ok(request)
    }

    /// Convert the client's messages into a conversation.
    pub fn conversation(&self) -> Result<Vec<Message>, String> {
        self.messages
            .iter()
            .map(|m| match m.role.to_ascii_lowercase().as_str() {
                "user" => Ok(Message::user(&m.content)),
                "assistant" | "model" => Ok(Message::assistant(&m.content)),
                other => Err(format!("Invalid request: unsupported role '{other}'")),
            })
            .collect()
    }
}

/// Pick the workspace for a request.
///
/// Prefers the directory of the current file when it exists inside `root`,
/// then the declared working directory when it is an existing directory
/// inside `root`, then `root`. Hints never widen the sandbox.
pub fn resolve_workspace(root: &Path, context: Option<&RequestContext>) -> WorkspaceContext {
    let Some(context) = context else {
        return WorkspaceContext::new(root);
    };

    if let Some(file) = context.current_file.as_deref().and_then(|f| existing(root, f)) {
        if file.starts_with(root) {
            if let Some(parent) = file.parent() {
                debug!(dir = %parent.display(), "Using current file's directory as workspace");
                return WorkspaceContext::new(parent).with_current_file(file.clone());
            }
        }
    }

    if let Some(dir) = context
        .working_directory
        .as_deref()
        .and_then(|d| existing(root, d))
        .filter(|d| d.is_dir())
    {
        if !dir.starts_with(root) {
            warn!(dir = %dir.display(), "Ignoring working directory outside the workspace root");
            return WorkspaceContext::new(root);
        }
        debug!(dir = %dir.display(), "Using declared working directory as workspace");
        return WorkspaceContext::new(dir);
    }

    WorkspaceContext::new(root)
}

/// Canonical form of `path` (relative paths are taken from `root`), if it exists.
fn existing(root: &Path, path: &str) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    root.join(path).canonicalize().ok()
}
