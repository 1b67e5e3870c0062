//! In-process backend.
//!
//! Nodes live in an ordered map keyed by their normalized relative path. Modification times
//! come from a logical clock, so two successive writes always observe distinct timestamps.

use crate::error::VfsError;
use crate::security;
use crate::{EntryKind, FileEntry, FileSystem};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone)]
enum Node {
    Folder { modified: SystemTime },
    File { data: Vec<u8>, modified: SystemTime },
}

impl Node {
    const fn modified(&self) -> SystemTime {
        match self {
            Self::Folder { modified } | Self::File { modified, .. } => *modified,
        }
    }

    const fn kind(&self) -> EntryKind {
        match self {
            Self::Folder { .. } => EntryKind::Folder,
            Self::File { .. } => EntryKind::File,
        }
    }
}

#[derive(Debug)]
pub struct MemoryInner {
    label: String,
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    clock: AtomicU64,
}

/// A shared in-memory tree.
///
/// Clones share the same tree. The empty relative path is the implicit root folder.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    inner: Arc<MemoryInner>,
}

impl Deref for MemoryFileSystem {
    type Target = MemoryInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::with_label("default")
    }

    /// Creates an empty tree whose URI is `memory://<label>`.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                label: label.into(),
                nodes: RwLock::new(BTreeMap::new()),
                clock: AtomicU64::new(0),
            }),
        }
    }

    fn tick(&self) -> SystemTime {
        let now = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        UNIX_EPOCH + Duration::from_millis(now)
    }

    fn ensure_folders(
        nodes: &mut BTreeMap<PathBuf, Node>,
        path: &Path,
        modified: SystemTime,
    ) -> Result<(), VfsError> {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if let Some(Node::File { .. }) = nodes.get(ancestor) {
                return Err(not_a_folder(ancestor));
            }
        }

        let mut ancestors: Vec<&Path> =
            path.ancestors().take_while(|a| !a.as_os_str().is_empty()).collect();
        ancestors.reverse();
        for ancestor in ancestors {
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Folder { modified });
        }
        Ok(())
    }

    fn ensure_parent(
        nodes: &mut BTreeMap<PathBuf, Node>,
        path: &Path,
        modified: SystemTime,
    ) -> Result<(), VfsError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                Self::ensure_folders(nodes, parent, modified)
            },
            _ => Ok(()),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn uri(&self) -> String {
        format!("memory://{}", self.label)
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, VfsError> {
        security::normalize_relative(path)
    }

    async fn exists(&self, path: &Path) -> Result<bool, VfsError> {
        let key = self.resolve(path)?;
        Ok(key.as_os_str().is_empty() || self.nodes.read().contains_key(&key))
    }

    async fn create_folder(&self, path: &Path) -> Result<(), VfsError> {
        let key = self.resolve(path)?;
        let modified = self.tick();
        Self::ensure_folders(&mut self.nodes.write(), &key, modified)?;
        debug!(path = %key.display(), "Folder created");
        Ok(())
    }

    async fn create_new(&self, path: &Path, data: &[u8]) -> Result<bool, VfsError> {
        let key = self.resolve(path)?;
        if key.as_os_str().is_empty() {
            return Ok(false);
        }
        let modified = self.tick();
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&key) {
            return Ok(false);
        }
        Self::ensure_parent(&mut nodes, &key, modified)?;
        nodes.insert(key, Node::File { data: data.to_vec(), modified });
        Ok(true)
    }

    async fn delete(&self, path: &Path) -> Result<bool, VfsError> {
        let key = self.resolve(path)?;
        if key.as_os_str().is_empty() {
            return Ok(false);
        }
        let mut nodes = self.nodes.write();
        match nodes.get(&key) {
            None => Ok(false),
            Some(Node::Folder { .. }) if has_children(&nodes, &key) => {
                debug!(path = %key.display(), "Folder not empty, deletion refused");
                Ok(false)
            },
            Some(_) => {
                nodes.remove(&key);
                debug!(path = %key.display(), "Entry deleted");
                Ok(true)
            },
        }
    }

    async fn children(&self, path: &Path) -> Result<Vec<FileEntry>, VfsError> {
        let key = self.resolve(path)?;
        let nodes = self.nodes.read();
        if !key.as_os_str().is_empty() {
            match nodes.get(&key) {
                Some(Node::Folder { .. }) => {},
                Some(Node::File { .. }) => return Err(not_a_folder(&key)),
                None => return Err(VfsError::not_found(&key)),
            }
        }

        let entries = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(key.as_path()))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let hidden = security::is_hidden(&name);
                Some(FileEntry { name, kind: node.kind(), hidden })
            })
            .collect();
        Ok(entries)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        let key = self.resolve(path)?;
        match self.nodes.read().get(&key) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Folder { .. }) => Err(VfsError::Io {
                source: ErrorKind::IsADirectory.into(),
                context: Some(format!("Read failed: {}", key.display()).into()),
            }),
            None => Err(VfsError::not_found(&key)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), VfsError> {
        let key = self.resolve(path)?;
        let modified = self.tick();
        let mut nodes = self.nodes.write();
        if let Some(Node::Folder { .. }) = nodes.get(&key) {
            return Err(VfsError::Io {
                source: ErrorKind::IsADirectory.into(),
                context: Some(format!("Write failed: {}", key.display()).into()),
            });
        }
        if key.as_os_str().is_empty() {
            return Err(not_a_folder(&key));
        }
        Self::ensure_parent(&mut nodes, &key, modified)?;
        nodes.insert(key, Node::File { data: data.to_vec(), modified });
        Ok(())
    }

    async fn last_modified(&self, path: &Path) -> Result<SystemTime, VfsError> {
        let key = self.resolve(path)?;
        if key.as_os_str().is_empty() {
            return Ok(UNIX_EPOCH);
        }
        self.nodes.read().get(&key).map(Node::modified).ok_or_else(|| VfsError::not_found(&key))
    }
}

fn has_children(nodes: &BTreeMap<PathBuf, Node>, key: &Path) -> bool {
    // Descendants sort directly after their folder.
    nodes.range(key.to_path_buf()..).nth(1).is_some_and(|(p, _)| p.starts_with(key))
}

fn not_a_folder(path: &Path) -> VfsError {
    VfsError::Io {
        source: ErrorKind::NotADirectory.into(),
        context: Some(format!("Not a folder: {}", path.display()).into()),
    }
}
