//! Sandboxed local-disk backend.
//!
//! All paths are resolved against a canonicalized root and validated so that neither `..`
//! sequences nor symlinks can reach outside of it.

use crate::builder::LocalFileSystemBuilder;
use crate::error::{VfsError, VfsErrorExt};
use crate::security;
use crate::{EntryKind, FileEntry, FileSystem};
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Marker embedded in temp file names so that crash leftovers can be recognised.
pub(crate) const TMP_MARKER: &str = ".vfstmp.";

/// The internal shared state of a [`LocalFileSystem`] instance.
#[derive(Debug)]
pub struct LocalInner {
    /// The canonicalized physical path on the disk where all data is stored.
    pub(crate) root: PathBuf,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
    /// Minimum age of a temp file before a sweep may delete it.
    pub(crate) stale_tmp_after: Duration,
}

/// A thread-safe handle to a directory on the local disk.
///
/// The handle is internally reference-counted (`Arc`) and can be cheaply cloned
/// across threads or tasks.
///
/// # Example
///
/// ```rust
/// use mstore_vfs::{FileSystem, LocalFileSystem, VfsError};
/// use std::path::Path;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), VfsError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let fs = LocalFileSystem::builder().root(tmp.path()).connect().await?;
///
///     assert!(fs.create_new(Path::new(".lock"), b"owner").await?);
///     assert!(!fs.create_new(Path::new(".lock"), b"intruder").await?);
///     assert_eq!(fs.read(Path::new(".lock")).await?, b"owner");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    pub(crate) inner: Arc<LocalInner>,
}

impl Deref for LocalFileSystem {
    type Target = LocalInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl LocalFileSystem {
    #[must_use = "The filesystem is not initialized until you call .connect()"]
    pub fn builder() -> LocalFileSystemBuilder {
        LocalFileSystemBuilder::new()
    }

    /// The canonicalized root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes temp files abandoned by writers that crashed mid-swap.
    ///
    /// Returns how many files were removed.
    pub async fn purge_tmp(&self) -> usize {
        crate::maintenance::purge_tmp(&self.root, self.stale_tmp_after).await
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }

    async fn create_parent(resolved: &Path) -> Result<(), VfsError> {
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create parent folders for {}", resolved.display()))?;
        }
        Ok(())
    }
}

impl FileSystem for LocalFileSystem {
    fn uri(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, VfsError> {
        security::resolve_path(&self.root, path)
    }

    async fn exists(&self, path: &Path) -> Result<bool, VfsError> {
        let resolved = self.resolve(path)?;
        fs::try_exists(&resolved)
            .await
            .context(format!("Existence check failed: {}", resolved.display()))
    }

    async fn create_folder(&self, path: &Path) -> Result<(), VfsError> {
        let resolved = self.resolve(path)?;
        fs::create_dir_all(&resolved)
            .await
            .context(format!("Failed to create folder: {}", resolved.display()))?;
        debug!(path = %resolved.display(), "Folder created");
        Ok(())
    }

    async fn create_new(&self, path: &Path, data: &[u8]) -> Result<bool, VfsError> {
        let resolved = self.resolve(path)?;
        Self::create_parent(&resolved).await?;

        let mut file =
            match fs::OpenOptions::new().create_new(true).write(true).open(&resolved).await {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
                Err(err) => {
                    return Err(VfsError::Io {
                        source: err,
                        context: Some(
                            format!("Exclusive create failed: {}", resolved.display()).into(),
                        ),
                    });
                },
            };
        file.write_all(data).await.context("Write failed")?;
        file.sync_all().await.context("Hardware sync failed")?;

        debug!(path = %resolved.display(), "File created exclusively");
        Ok(true)
    }

    async fn delete(&self, path: &Path) -> Result<bool, VfsError> {
        let resolved = self.resolve(path)?;
        let meta = match fs::symlink_metadata(&resolved).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(VfsError::Io {
                    source: err,
                    context: Some(format!("Failed to stat: {}", resolved.display()).into()),
                });
            },
        };

        let removed =
            if meta.is_dir() { fs::remove_dir(&resolved).await } else { fs::remove_file(&resolved).await };

        match removed {
            Ok(()) => {
                debug!(path = %resolved.display(), "Entry deleted");
                Ok(true)
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => {
                debug!(path = %resolved.display(), "Folder not empty, deletion refused");
                Ok(false)
            },
            Err(err) => Err(VfsError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    async fn children(&self, path: &Path) -> Result<Vec<FileEntry>, VfsError> {
        let resolved = self.resolve(path)?;
        let mut dir = match fs::read_dir(&resolved).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(VfsError::not_found(&resolved));
            },
            Err(err) => {
                return Err(VfsError::Io {
                    source: err,
                    context: Some(format!("Failed to list: {}", resolved.display()).into()),
                });
            },
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.context("Failed to read entry")? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks; the sandbox check happens on every later access anyway.
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(VfsError::Io {
                        source: err,
                        context: Some(format!("Failed to stat: {}", entry.path().display()).into()),
                    });
                },
            };
            let kind = if meta.is_dir() { EntryKind::Folder } else { EntryKind::File };
            let hidden = security::is_hidden(&name);
            entries.push(FileEntry { name, kind, hidden });
        }

        Ok(entries)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        let resolved = self.resolve(path)?;
        match fs::read(&resolved).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(VfsError::not_found(&resolved)),
            Err(err) => Err(VfsError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes data atomically.
    ///
    /// 1. Data is written to a unique hidden temp file (`.<name>.vfstmp.<pid>.<n>`).
    /// 2. The file is synced to hardware (`fsync`).
    /// 3. The temp file is renamed over the destination.
    ///
    /// On platforms that do not support atomic replace for existing targets, the
    /// implementation falls back to remove-then-rename.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), VfsError> {
        let resolved = self.resolve(path)?;
        Self::create_parent(&resolved).await?;

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&resolved)
                    .await
                    .context(format!("Failed to replace existing file: {}", resolved.display()))?;
                fs::rename(&temp, &resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                let _ = fs::remove_file(&temp).await;
                return Err(VfsError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), "File saved atomically");
        Ok(())
    }

    async fn last_modified(&self, path: &Path) -> Result<SystemTime, VfsError> {
        let resolved = self.resolve(path)?;
        match fs::metadata(&resolved).await {
            Ok(meta) => meta
                .modified()
                .context(format!("Modification time unavailable: {}", resolved.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(VfsError::not_found(&resolved)),
            Err(err) => Err(VfsError::Io {
                source: err,
                context: Some(format!("Failed to get metadata: {}", resolved.display()).into()),
            }),
        }
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    let pid = std::process::id();
    target.with_file_name(format!(".{file_name}{TMP_MARKER}{pid}.{counter}"))
}
