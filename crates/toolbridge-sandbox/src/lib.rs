//! Workspace-confined filesystem access for toolbridge tools.
//!
//! Every path a tool touches goes through [`Sandbox::resolve`], which
//! normalizes `.`/`..` segments and resolves symlinks *before* checking that
//! the result still lies under the workspace root.
//!
//! # Example
//!
//! ```rust,no_run
//! use toolbridge_sandbox::Sandbox;
//!
//! let sandbox = Sandbox::new("/path/to/project")?;
//! let path = sandbox.resolve("src/Main.java")?;
//! let text = sandbox.read_bounded(&path, 100 * 1024)?;
//! # Ok::<(), toolbridge_sandbox::SandboxError>(())
//! ```

pub mod error;

pub use error::{SandboxError, SandboxResult};

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use toolbridge_util::path::{display_relative, normalize};
use tracing::{debug, warn};

/// Number of leading bytes inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// A filesystem view confined to one workspace root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Canonical workspace root.
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`.
    ///
    /// The root is canonicalized so that containment checks compare
    /// symlink-free paths on both sides.
    pub fn new(root: impl AsRef<Path>) -> SandboxResult<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SandboxError::NotFound(root.to_path_buf()),
            _ => SandboxError::Io(e),
        })?;

        if !root.is_dir() {
            return Err(SandboxError::NotADirectory(root));
        }

        Ok(Self { root })
    }

    /// Get the canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative or absolute path to an absolute path inside the workspace.
    ///
    /// Relative paths are joined onto the root. The joined path is normalized
    /// lexically, then symlinks are resolved for the longest existing prefix,
    /// and only then is containment checked. Paths that do not exist yet are
    /// allowed as long as they would land inside the root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> SandboxResult<PathBuf> {
        let requested = path.as_ref();
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let normalized = normalize(&joined);
        let resolved = resolve_symlinks(&normalized)?;

        if !resolved.starts_with(&self.root) {
            warn!(
                requested = %requested.display(),
                resolved = %resolved.display(),
                "Rejected path outside workspace"
            );
            return Err(SandboxError::access_denied(requested.display().to_string()));
        }

        Ok(resolved)
    }

    /// Read a resolved file as text, failing if it exceeds `max_bytes`.
    ///
    /// Files with a NUL byte near the start are reported as
    /// [`SandboxError::Binary`] rather than decoded.
    pub fn read_bounded(&self, path: &Path, max_bytes: u64) -> SandboxResult<String> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SandboxError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(SandboxError::NotAFile(path.to_path_buf()));
        }

        let size = metadata.len();
        if size > max_bytes {
            return Err(SandboxError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_bytes,
            });
        }

        let (bytes, over) = read_at_most(fs::File::open(path)?, max_bytes)?;
        if over {
            return Err(SandboxError::TooLarge {
                path: path.to_path_buf(),
                size: size.max(max_bytes.saturating_add(1)),
                limit: max_bytes,
            });
        }
        let size = bytes.len() as u64;

        let sample = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sample.contains(&0) {
            return Err(SandboxError::Binary {
                path: path.to_path_buf(),
                size,
            });
        }

        debug!(path = %path.display(), size, "Read file");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Render a path relative to the workspace root (`.` for the root itself).
    pub fn relative(&self, path: &Path) -> String {
        display_relative(path, &self.root)
    }
}

/// Read up to `max_bytes` bytes, reporting whether the source had more.
///
/// The size checked against file metadata can be stale by the time the file
/// is read, so the read itself is bounded too.
fn read_at_most(reader: impl Read, max_bytes: u64) -> std::io::Result<(Vec<u8>, bool)> {
    let mut bytes = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)?;
    let over = bytes.len() as u64 > max_bytes;
    if over {
        bytes.truncate(max_bytes as usize);
    }
    Ok((bytes, over))
}

/// Canonicalize the longest existing prefix of `path` and re-attach the rest.
fn resolve_symlinks(path: &Path) -> SandboxResult<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut remainder: Vec<std::ffi::OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                let mut resolved = canonical;
                for part in remainder.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match existing.file_name() {
                    Some(name) => remainder.push(name.to_os_string()),
                    None => return Ok(path.to_path_buf()),
                }
                if !existing.pop() {
                    return Ok(path.to_path_buf());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace() -> (tempfile::TempDir, Sandbox) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/A.java"), "class A {}\n").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_resolve_relative_path() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("src/A.java").unwrap();
        assert_eq!(path, sandbox.root().join("src/A.java"));
    }

    #[test]
    fn test_resolve_empty_is_root() {
        let (_dir, sandbox) = workspace();
        assert_eq!(sandbox.resolve("").unwrap(), sandbox.root());
    }

    #[test]
    fn test_resolve_dot_segments_inside_root() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("./src/../src/./A.java").unwrap();
        assert_eq!(path, sandbox.root().join("src/A.java"));
    }

    #[test]
    fn test_resolve_rejects_parent_escape() {
        let (_dir, sandbox) = workspace();
        let err = sandbox.resolve("../../etc/passwd").unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_resolve_rejects_escape_hidden_behind_subdir() {
        let (_dir, sandbox) = workspace();
        let err = sandbox.resolve("src/../../outside.txt").unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_resolve_rejects_absolute_outside() {
        let (_dir, sandbox) = workspace();
        let outside = tempdir().unwrap();
        let err = sandbox.resolve(outside.path()).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_resolve_accepts_absolute_inside() {
        let (_dir, sandbox) = workspace();
        let inside = sandbox.root().join("src");
        assert_eq!(sandbox.resolve(&inside).unwrap(), inside);
    }

    #[test]
    fn test_resolve_nonexistent_inside_is_allowed() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("src/missing/B.java").unwrap();
        assert_eq!(path, sandbox.root().join("src/missing/B.java"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_rejects_symlink_escape() {
        let (dir, sandbox) = workspace();
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let err = sandbox.resolve("link/secret.txt").unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_read_bounded() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("src/A.java").unwrap();
        assert_eq!(sandbox.read_bounded(&path, 1024).unwrap(), "class A {}\n");
    }

    #[test]
    fn test_read_bounded_too_large() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("src/A.java").unwrap();
        let err = sandbox.read_bounded(&path, 4).unwrap_err();
        assert!(matches!(err, SandboxError::TooLarge { size: 11, limit: 4, .. }));
    }

    #[test]
    fn test_read_at_most_stops_past_limit() {
        let (bytes, over) = read_at_most(std::io::Cursor::new(vec![b'x'; 10]), 4).unwrap();
        assert!(over);
        assert_eq!(bytes.len(), 4);

        let (bytes, over) = read_at_most(std::io::Cursor::new(b"abcd".to_vec()), 4).unwrap();
        assert!(!over);
        assert_eq!(bytes, b"abcd");
    }

    #[test]
    fn test_read_at_most_bounds_unsized_reader() {
        // An endless reader stands in for a file that keeps growing after its
        // size was checked.
        let (bytes, over) = read_at_most(std::io::repeat(b'a'), 1024).unwrap();
        assert!(over);
        assert_eq!(bytes.len(), 1024);
    }

    #[test]
    fn test_read_bounded_binary() {
        let (dir, sandbox) = workspace();
        std::fs::write(dir.path().join("blob.bin"), b"ab\x00cd").unwrap();
        let path = sandbox.resolve("blob.bin").unwrap();
        assert!(matches!(
            sandbox.read_bounded(&path, 1024),
            Err(SandboxError::Binary { size: 5, .. })
        ));
    }

    #[test]
    fn test_read_bounded_missing_and_directory() {
        let (_dir, sandbox) = workspace();
        let missing = sandbox.resolve("nope.txt").unwrap();
        assert!(matches!(
            sandbox.read_bounded(&missing, 1024),
            Err(SandboxError::NotFound(_))
        ));

        let dir_path = sandbox.resolve("src").unwrap();
        assert!(matches!(
            sandbox.read_bounded(&dir_path, 1024),
            Err(SandboxError::NotAFile(_))
        ));
    }

    #[test]
    fn test_relative_display() {
        let (_dir, sandbox) = workspace();
        let path = sandbox.resolve("src/A.java").unwrap();
        assert_eq!(sandbox.relative(&path), "src/A.java");
        assert_eq!(sandbox.relative(sandbox.root()), ".");
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            Sandbox::new(&missing),
            Err(SandboxError::NotFound(_))
        ));
    }
}
