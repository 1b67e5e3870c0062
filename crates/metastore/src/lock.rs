//! Store-wide advisory lock.
//!
//! Two layers: an async mutex serializes tasks sharing one store instance, and a marker file
//! created with an exclusive create serializes processes sharing one store root. Both waits
//! count against the same timeout.

use crate::error::{MetaStoreError, MetaStoreErrorExt, Result};
use mstore_domain::config::LockConfig;
use mstore_vfs::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct StoreLock<F: FileSystem> {
    fs: F,
    marker: PathBuf,
    local: Arc<Mutex<()>>,
    poll_interval: Duration,
    timeout: Duration,
}

impl<F: FileSystem> StoreLock<F> {
    #[must_use]
    pub fn new(fs: F, marker: impl Into<PathBuf>, config: &LockConfig) -> Self {
        Self {
            fs,
            marker: marker.into(),
            local: Arc::new(Mutex::new(())),
            poll_interval: config.poll_interval().max(Duration::from_millis(1)),
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Waits until both the in-process mutex and the marker file are held.
    ///
    /// # Errors
    /// [`MetaStoreError::LockTimeout`] once the configured bound has elapsed, or
    /// [`MetaStoreError::Storage`] if the marker cannot be created for another reason.
    pub async fn acquire(&self) -> Result<LockGuard<F>> {
        let started = Instant::now();

        let local = tokio::time::timeout(self.timeout, Arc::clone(&self.local).lock_owned())
            .await
            .map_err(|_| MetaStoreError::LockTimeout {
                waited: started.elapsed(),
                context: Some("waiting for another task of this process".into()),
            })?;

        let token = nanoid::nanoid!();
        let body = format!("{token}\n{}\n", std::process::id());

        // Built before the first create so a cancelled acquire still cleans up its marker.
        let mut guard = LockGuard {
            fs: self.fs.clone(),
            marker: self.marker.clone(),
            token,
            armed: false,
            local: Some(local),
        };

        loop {
            guard.armed = true;
            let created = self
                .fs
                .create_new(&self.marker, body.as_bytes())
                .await
                .context(format!("Failed to create lock marker {}", self.marker.display()))?;
            if created {
                debug!(marker = %self.marker.display(), "Store lock acquired");
                return Ok(guard);
            }
            guard.armed = false;

            let waited = started.elapsed();
            if waited >= self.timeout {
                warn!(marker = %self.marker.display(), ?waited, "Store lock held by another owner");
                return Err(MetaStoreError::LockTimeout {
                    waited,
                    context: Some(format!("marker {}", self.marker.display()).into()),
                });
            }
            tokio::time::sleep(self.poll_interval.min(self.timeout - waited)).await;
        }
    }
}

/// Proof of exclusive access. Release it explicitly with [`LockGuard::release`].
///
/// Dropping the guard without releasing it (panic, cancelled future) removes the marker from a
/// background task. That task keeps the in-process mutex until the marker is gone.
#[derive(Debug)]
pub struct LockGuard<F: FileSystem> {
    fs: F,
    marker: PathBuf,
    token: String,
    /// The marker may carry our token and has not been removed yet.
    armed: bool,
    local: Option<OwnedMutexGuard<()>>,
}

impl<F: FileSystem> LockGuard<F> {
    /// Removes the marker.
    pub async fn release(mut self) -> Result<()> {
        let removed = remove_marker(&self.fs, &self.marker, &self.token).await;
        self.armed = false;
        removed
    }

    /// Releases the lock and hands back `result`.
    ///
    /// The operation's own error wins over a release failure, which is only logged then.
    pub async fn release_with<T>(self, result: Result<T>) -> Result<T> {
        let released = self.release().await;
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!(error = %release_err, "Lock release failed after operation error");
                Err(e)
            },
        }
    }
}

impl<F: FileSystem> Drop for LockGuard<F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let fs = self.fs.clone();
        let marker = std::mem::take(&mut self.marker);
        let token = std::mem::take(&mut self.token);
        let local = self.local.take();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = remove_marker(&fs, &marker, &token).await {
                        warn!(error = %e, "Deferred lock release failed");
                    }
                    drop(local);
                });
            },
            Err(_) => {
                warn!(marker = %marker.display(), "Lock guard dropped outside a runtime, marker left behind");
            },
        }
    }
}

async fn remove_marker<F: FileSystem>(fs: &F, marker: &Path, token: &str) -> Result<()> {
    let body = match fs.read(marker).await {
        Ok(body) => body,
        Err(e) if e.is_not_found() => {
            debug!(marker = %marker.display(), "Lock marker already gone");
            return Ok(());
        },
        Err(e) => return Err(e).context("Failed to read lock marker"),
    };

    let owner = String::from_utf8_lossy(&body);
    if owner.lines().next() != Some(token) {
        debug!(marker = %marker.display(), "Lock marker owned by someone else, left in place");
        return Ok(());
    }

    if fs.delete(marker).await.context("Failed to remove lock marker")? {
        debug!(marker = %marker.display(), "Store lock released");
        Ok(())
    } else {
        Err(MetaStoreError::storage_refused(format!(
            "lock marker {} could not be removed",
            marker.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mstore_vfs::{LocalFileSystem, MemoryFileSystem};

    fn config(poll: u64, timeout: u64) -> LockConfig {
        LockConfig { poll_interval_ms: poll, timeout_ms: timeout }
    }

    #[tokio::test]
    async fn release_removes_marker() {
        let fs = MemoryFileSystem::new();
        let lock = StoreLock::new(fs.clone(), "meta/.lock", &config(5, 500));

        let guard = lock.acquire().await.unwrap();
        assert!(fs.exists(Path::new("meta/.lock")).await.unwrap());
        guard.release().await.unwrap();
        assert!(!fs.exists(Path::new("meta/.lock")).await.unwrap());
    }

    #[tokio::test]
    async fn foreign_marker_times_out() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("meta/.lock"), b"someone-else\n1\n").await.unwrap();
        let lock = StoreLock::new(fs.clone(), "meta/.lock", &config(5, 50));

        let err = lock.acquire().await.unwrap_err();
        let MetaStoreError::LockTimeout { waited, .. } = err else {
            panic!("expected timeout, got {err}");
        };
        assert!(waited >= Duration::from_millis(50));
        assert_eq!(fs.read(Path::new("meta/.lock")).await.unwrap(), b"someone-else\n1\n");
    }

    #[tokio::test]
    async fn waiter_gets_lock_after_holder_releases() {
        let fs = MemoryFileSystem::new();
        let lock = Arc::new(StoreLock::new(fs, "meta/.lock", &config(5, 2_000)));

        let guard = lock.acquire().await.unwrap();
        let waiter = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.acquire().await.map(|g| g.token.clone()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let first = guard.token.clone();
        guard.release().await.unwrap();
        let second = waiter.await.unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn release_leaves_stolen_marker() {
        let fs = MemoryFileSystem::new();
        let lock = StoreLock::new(fs.clone(), "meta/.lock", &config(5, 500));

        let guard = lock.acquire().await.unwrap();
        fs.write(Path::new("meta/.lock"), b"intruder\n").await.unwrap();
        guard.release().await.unwrap();
        assert!(fs.exists(Path::new("meta/.lock")).await.unwrap());
    }

    #[tokio::test]
    async fn dropped_guard_cleans_up_in_background() {
        let fs = MemoryFileSystem::new();
        let lock = StoreLock::new(fs.clone(), "meta/.lock", &config(5, 1_000));

        drop(lock.acquire().await.unwrap());
        let guard = lock.acquire().await.unwrap();
        guard.release().await.unwrap();
        assert!(!fs.exists(Path::new("meta/.lock")).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_at_any_point_leaves_no_marker_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::builder().root(temp.path()).connect().await.unwrap();
        let lock = StoreLock::new(fs.clone(), "meta/.lock", &config(5, 2_000));

        for micros in (0..500).step_by(10) {
            let attempt = async {
                let guard = lock.acquire().await?;
                guard.release().await
            };
            let _ = tokio::time::timeout(Duration::from_micros(micros), attempt).await;

            let guard = lock.acquire().await.unwrap_or_else(|e| panic!("after {micros}us: {e}"));
            guard.release().await.unwrap();
            assert!(!fs.exists(Path::new("meta/.lock")).await.unwrap(), "after {micros}us");
        }
    }
}
