//! Temporary workspaces for tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary workspace with configurable file structure.
///
/// The directory is removed when the built workspace is dropped.
pub struct TestWorkspace {
    temp_dir: TempDir,
    /// Files to create (path relative to root -> contents).
    files: BTreeMap<PathBuf, Vec<u8>>,
    /// Directories to create (paths relative to root).
    dirs: Vec<PathBuf>,
}

impl TestWorkspace {
    /// Create a new workspace builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: BTreeMap::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a text file. Parent directories are created automatically.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.into().into_bytes());
        self
    }

    /// Add a file with raw bytes.
    pub fn with_bytes(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.as_ref().to_path_buf(), contents.into());
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add a small Java project laid out the way the IDE expects.
    pub fn with_java_project(self) -> Self {
        self.with_file("build.xml", "<project name=\"demo\"/>\n")
            .with_file(
                "src/demo/Main.java",
                "package demo;\n\npublic class Main {\n    public static void main(String[] args) {\n        System.out.println(new Greeter().greet(\"world\"));\n    }\n}\n",
            )
            .with_file(
                "src/demo/Greeter.java",
                "package demo;\n\npublic class Greeter {\n    public String greet(String name) {\n        return \"Hello, \" + name;\n    }\n}\n",
            )
            .with_dir("classes")
    }

    /// Create all files and directories.
    pub fn build(self) -> BuiltTestWorkspace {
        let root = self.temp_dir.path();

        for dir in &self.dirs {
            let full_path = root.join(dir);
            fs::create_dir_all(&full_path).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", full_path.display(), e)
            });
        }

        for (path, contents) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).unwrap_or_else(|e| {
                    panic!(
                        "Failed to create parent directory for {}: {}",
                        full_path.display(),
                        e
                    )
                });
            }
            fs::write(&full_path, contents)
                .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
        }

        BuiltTestWorkspace {
            temp_dir: self.temp_dir,
        }
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// A workspace with its files on disk.
pub struct BuiltTestWorkspace {
    temp_dir: TempDir,
}

impl BuiltTestWorkspace {
    /// Path to the workspace root as created.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Canonical path to the workspace root (what the sandbox reports).
    pub fn canonical_path(&self) -> PathBuf {
        self.path()
            .canonicalize()
            .expect("Failed to canonicalize workspace root")
    }

    /// Write a file after the workspace was built.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&full_path, contents)
            .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
    }
}
