use crate::error::{VfsError, VfsErrorExt};
use crate::local::{LocalFileSystem, LocalInner};
use crate::maintenance::DEFAULT_STALE_TMP_AFTER;
use private::Sealed;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Knobs of the local backend, independent of the root.
#[derive(Debug, Clone, Copy)]
struct LocalOptions {
    create_root: bool,
    purge_on_connect: bool,
    stale_tmp_after: Duration,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self { create_root: true, purge_on_connect: true, stale_tmp_after: DEFAULT_STALE_TMP_AFTER }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Builds a [`LocalFileSystem`]. A root is required before [`LocalFileSystemBuilder::connect`]
/// becomes available.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct LocalFileSystemBuilder<S: Sealed = NoRoot> {
    root: S,
    options: LocalOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> LocalFileSystemBuilder<S> {
    /// Create the root folder (and its ancestors) when missing. On by default.
    #[must_use]
    pub const fn create(mut self, enable: bool) -> Self {
        self.options.create_root = enable;
        self
    }

    /// Sweep crash leftovers while connecting. On by default.
    #[must_use]
    pub const fn purge_on_connect(mut self, enable: bool) -> Self {
        self.options.purge_on_connect = enable;
        self
    }

    /// Age after which a temp file is considered abandoned by its writer. Five minutes by
    /// default; keep it well above the longest expected single write.
    #[must_use]
    pub const fn stale_tmp_after(mut self, age: Duration) -> Self {
        self.options.stale_tmp_after = age;
        self
    }

    #[must_use]
    pub fn root(self, path: impl Into<PathBuf>) -> LocalFileSystemBuilder<WithRoot> {
        LocalFileSystemBuilder { root: WithRoot(path.into()), options: self.options }
    }
}

impl LocalFileSystemBuilder<NoRoot> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalFileSystemBuilder<WithRoot> {
    /// Opens the root as a sandbox.
    ///
    /// The root is canonicalized so later symlink checks compare physical paths, and it must be
    /// a directory. Unless disabled, temp files older than the staleness threshold are removed
    /// before the handle is returned; a failed sweep is logged and never fails the connect.
    ///
    /// # Errors
    /// [`VfsError::Io`] if the root is missing (and may not be created), is not a directory, or
    /// cannot be resolved.
    pub async fn connect(self) -> Result<LocalFileSystem, VfsError> {
        let LocalFileSystemBuilder { root: WithRoot(root), options } = self;

        if options.create_root && !fs::try_exists(&root).await.unwrap_or(false) {
            fs::create_dir_all(&root)
                .await
                .context(format!("Failed to create root {}", root.display()))?;
            info!(root = %root.display(), "Created filesystem root");
        }

        let canonical = fs::canonicalize(&root)
            .await
            .context(format!("Failed to resolve root {}", root.display()))?;
        let meta = fs::metadata(&canonical)
            .await
            .context(format!("Failed to inspect root {}", canonical.display()))?;
        if !meta.is_dir() {
            return Err(VfsError::Io {
                source: io::Error::from(io::ErrorKind::NotADirectory),
                context: Some(format!("Root {} is not a directory", canonical.display()).into()),
            });
        }

        let local = LocalFileSystem {
            inner: Arc::new(LocalInner {
                root: canonical,
                tmp_counter: AtomicU64::new(1),
                stale_tmp_after: options.stale_tmp_after,
            }),
        };

        if options.purge_on_connect {
            local.purge_tmp().await;
        } else {
            debug!(root = %local.root().display(), "Temp file sweep skipped");
        }

        Ok(local)
    }
}
