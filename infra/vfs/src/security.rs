use crate::error::VfsError;
use std::path::{Component, Path, PathBuf};

/// Collapse `.` / `..` lexically while ensuring the path never escapes the backend root.
///
/// Allows `..` as long as it doesn't go "above" the empty relative base. The result is the
/// canonical key used by every backend, so `a/./b` and `a/c/../b` address the same node.
pub(crate) fn normalize_relative(path: &Path) -> Result<PathBuf, VfsError> {
    let mut out = PathBuf::new();

    for c in path.components() {
        match c {
            Component::CurDir => {},
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(VfsError::PathTraversal {
                        message: path.display().to_string().into(),
                        context: Some("Path attempted to escape sandbox via '..'".into()),
                    });
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(VfsError::PathTraversal {
                    message: path.display().to_string().into(),
                    context: Some("Absolute paths are not allowed in sandbox".into()),
                });
            },
        }
    }

    Ok(out)
}

/// Safely joins a path to the physical root and ensures it doesn't escape the sandbox.
pub(crate) fn resolve_path(root: &Path, path: &Path) -> Result<PathBuf, VfsError> {
    let safe_rel = normalize_relative(path)?;
    let joined = if safe_rel.as_os_str().is_empty() { root.to_path_buf() } else { root.join(safe_rel) };

    match joined.canonicalize() {
        Ok(canonical) => validate_canonical(root, canonical),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_path(root, &joined),
        Err(e) => Err(VfsError::Io { source: e, context: None }),
    }
}

fn validate_canonical(root: &Path, canonical: PathBuf) -> Result<PathBuf, VfsError> {
    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        Err(VfsError::PathTraversal {
            message: canonical.display().to_string().into(),
            context: Some("Path resolves outside the sandbox through a symlink".into()),
        })
    }
}

/// Validates a path that doesn't exist yet by finding and verifying its first existing ancestor.
///
/// Walks up from the target until it finds a parent that exists on disk, then verifies that
/// parent is within the sandbox. Deep paths can be validated without creating their folders.
fn validate_path(root: &Path, joined: &Path) -> Result<PathBuf, VfsError> {
    if !joined.starts_with(root) {
        return Err(VfsError::PathTraversal {
            message: joined.display().to_string().into(),
            context: Some("Path is outside sandbox boundaries".into()),
        });
    }

    let mut current = Some(joined);

    while let Some(path) = current {
        if path == root {
            return Ok(joined.to_path_buf());
        }

        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(canonical) => Err(VfsError::PathTraversal {
                    message: canonical.display().to_string().into(),
                    context: Some("Existing parent directory is a symlink outside sandbox".into()),
                }),
                Err(e) => Err(VfsError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = path.parent();
    }

    Err(VfsError::PathTraversal {
        message: joined.display().to_string().into(),
        context: Some("No valid parent directory found within sandbox".into()),
    })
}

/// Dot-prefixed names are hidden on every backend.
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
