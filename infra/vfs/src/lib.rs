//! A backend-agnostic filesystem abstraction for document stores.
//!
//! Every path handed to a [`FileSystem`] is relative to the backend root. Absolute paths and
//! `..` sequences that would climb above the root are rejected before any I/O happens.
//!
//! # Backends
//!
//! - **[`LocalFileSystem`]**: a sandboxed directory on the local disk. Writes use an "atomic
//!   swap" (hidden temp file + `fsync` + `rename`), and stale temp files left by crashed writers
//!   are purged when the backend connects.
//! - **[`MemoryFileSystem`]**: an in-process tree with a logical clock, useful for tests and for
//!   object-storage-like deployments where nothing touches the local disk.
//!
//! # Hidden entries
//!
//! Dot-prefixed names are reported as hidden by every backend. Temp files are always
//! dot-prefixed, so an in-flight write never shows up as a regular entry.
//!
//! # Examples
//!
//! ```rust
//! use mstore_vfs::{FileSystem, LocalFileSystem, VfsError};
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), VfsError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let fs = LocalFileSystem::builder().root(&root).create(true).connect().await?;
//!
//!     fs.write(Path::new("ns/doc.xml"), b"<doc/>").await?;
//!     assert!(fs.exists(Path::new("ns/doc.xml")).await?);
//!
//!     let children = fs.children(Path::new("ns")).await?;
//!     assert_eq!(children.len(), 1);
//!     assert!(children[0].is_file());
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod local;
mod maintenance;
mod memory;
mod security;

pub use builder::LocalFileSystemBuilder;
pub use error::{VfsError, VfsErrorExt};
pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Folder,
}

/// A child reported by [`FileSystem::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub kind: EntryKind,
    pub hidden: bool,
}

impl FileEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// The storage contract a document store relies on.
///
/// Implementations are cheap handles (`Clone`) that can be shared across tasks.
pub trait FileSystem: Clone + Debug + Send + Sync + 'static {
    /// Human-readable location of the backend root, e.g. `file:///srv/meta`.
    fn uri(&self) -> String;

    /// Resolves a relative path to the backend's physical location.
    ///
    /// # Errors
    /// Returns [`VfsError::PathTraversal`] if the path escapes the root.
    fn resolve(&self, path: &Path) -> Result<PathBuf, VfsError>;

    fn exists(&self, path: &Path) -> impl Future<Output = Result<bool, VfsError>> + Send;

    /// Creates a folder and all of its missing ancestors.
    fn create_folder(&self, path: &Path) -> impl Future<Output = Result<(), VfsError>> + Send;

    /// Atomically creates a file that must not exist yet.
    ///
    /// Returns `Ok(false)` when the target is already present, leaving it untouched.
    fn create_new(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl Future<Output = Result<bool, VfsError>> + Send;

    /// Deletes a file or an empty folder.
    ///
    /// Returns `Ok(false)` if the target is absent or is a folder that still has children.
    fn delete(&self, path: &Path) -> impl Future<Output = Result<bool, VfsError>> + Send;

    /// Lists the direct children of a folder.
    ///
    /// # Errors
    /// Returns [`VfsError::NotFound`] if the folder does not exist.
    fn children(&self, path: &Path)
    -> impl Future<Output = Result<Vec<FileEntry>, VfsError>> + Send;

    fn read(&self, path: &Path) -> impl Future<Output = Result<Vec<u8>, VfsError>> + Send;

    /// Replaces the content of a file, creating missing parent folders.
    fn write(&self, path: &Path, data: &[u8]) -> impl Future<Output = Result<(), VfsError>> + Send;

    fn last_modified(&self, path: &Path)
    -> impl Future<Output = Result<SystemTime, VfsError>> + Send;
}
