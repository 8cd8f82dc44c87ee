//! System instruction sent with every provider call.

use toolbridge_tools::WorkspaceContext;
use toolbridge_util::path::display_relative;

/// Build the system instruction for a workspace.
pub fn build_system_instruction(workspace: &WorkspaceContext) -> String {
    let current_file = match &workspace.current_file {
        Some(file) => display_relative(file, &workspace.root),
        None => "(none)".to_string(),
    };

    format!(
        r#"You are a programming assistant embedded in a Java IDE.

Workspace root: {}
Current file: {}

You can inspect the user's project with the read_file, list_directory and search_files functions.
All paths are relative to the workspace root. Look at files before answering questions about them,
and answer in plain prose once you have what you need."#,
        workspace.root.display(),
        current_file
    )
}
