//! Testing utilities and fixtures for toolbridge.
//!
//! - **Fixtures**: temporary workspaces with files on disk
//! - **Providers**: a scripted model that replays queued turns and records
//!   every conversation it was sent
//!
//! # Example Usage
//!
//! ```rust
//! use toolbridge_test_utils::{ScriptedProvider, TestWorkspace};
//!
//! let workspace = TestWorkspace::new()
//!     .with_file("A.java", "class A {}")
//!     .with_file("B.java", "class B {}")
//!     .build();
//!
//! let provider = ScriptedProvider::new()
//!     .with_function_call("list_directory", serde_json::json!({ "path": "" }))
//!     .with_text("There are two classes.");
//!
//! assert!(workspace.path().join("A.java").exists());
//! assert_eq!(provider.call_count(), 0);
//! ```

pub mod fixtures;
pub mod providers;

pub use fixtures::{BuiltTestWorkspace, TestWorkspace};
pub use providers::{RecordedCall, ScriptedProvider, ScriptedResponse};
