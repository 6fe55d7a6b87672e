/// Identity keys for compiled-unit caching
///
/// A key is either the normalized absolute path of a file-backed script or the
/// content hash of inline source text. The two live in separate enum variants,
/// so a path can never collide with a hash.
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// Absolute, lexically normalized script path
    File(PathBuf),
    /// Hex-encoded SHA256 of inline source text
    Source(String),
}

impl IdentityKey {
    /// Key for a file-backed script. Relative paths resolve against `base_dir`.
    pub fn for_file(path: &Path, base_dir: &Path) -> Self {
        Self::File(normalize_path(&base_dir.join(path)))
    }

    /// Script path behind a file key
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Source(_) => None,
        }
    }

    /// Key for inline source text
    pub fn for_source(source: &str) -> Self {
        let hash = Sha256::digest(source.as_bytes());
        Self::Source(hex::encode(hash))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            // First 16 characters (64 bits) are plenty for log lines
            Self::Source(hash) => write!(f, "source:{}", &hash[..16.min(hash.len())]),
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// Symlinks are left unresolved so a key is stable whether or
/// not the file currently exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if normalized.file_name().is_some() {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}
