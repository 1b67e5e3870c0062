//! The storage engine.
//!
//! Every public operation takes the store lock, runs an `*_unlocked` body and releases the lock
//! on every exit path. Bodies only call other bodies, never public operations, so nothing
//! re-polls a lock that is already held.

mod builder;
mod element;
mod element_type;
mod namespace;

pub use builder::{MetaStoreBuilder, NoFs, WithFs};

use crate::cache::CacheIndex;
use crate::codec::RecordCodec;
use crate::error::{MetaStoreErrorExt, Result};
use crate::lock::StoreLock;
use crate::path::PathConvention;
use mstore_vfs::{FileEntry, FileSystem};
use std::future::Future;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub struct MetaStoreInner<F: FileSystem> {
    fs: F,
    name: String,
    paths: PathConvention,
    codec: Arc<dyn RecordCodec>,
    cache: CacheIndex,
    lock: StoreLock<F>,
}

/// A metadata store rooted in a folder of a [`FileSystem`].
///
/// The handle is reference-counted; clones share the cache and the in-process lock.
///
/// # Example
///
/// ```rust
/// use mstore::{MetaStore, Result};
/// use mstore_domain::{Element, ElementType};
/// use mstore_vfs::MemoryFileSystem;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<()> {
///     let store = MetaStore::builder().filesystem(MemoryFileSystem::new()).open().await?;
///
///     store.create_namespace("etl").await?;
///     let jobs = store.create_element_type("etl", ElementType::new("etl", "jobs")).await?;
///     store.create_element("etl", &jobs, Element::new("nightly").with_value("0 2 * * *")).await?;
///
///     let found = store.element_by_name("etl", &jobs, "NIGHTLY").await?;
///     assert_eq!(found.and_then(|e| e.id).as_deref(), Some("nightly"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MetaStore<F: FileSystem> {
    inner: Arc<MetaStoreInner<F>>,
}

impl<F: FileSystem> Clone for MetaStore<F> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<F: FileSystem> Deref for MetaStore<F> {
    type Target = MetaStoreInner<F>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<F: FileSystem> MetaStore<F> {
    #[must_use = "The store is not opened until you call .open()"]
    pub fn builder() -> MetaStoreBuilder<F> {
        MetaStoreBuilder::new()
    }

    /// Store name stamped onto every element-type handle this store returns.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn meta_folder(&self) -> &Path {
        self.paths.meta_folder()
    }

    #[must_use]
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    #[must_use]
    pub fn paths(&self) -> &PathConvention {
        &self.paths
    }

    #[must_use]
    pub fn codec(&self) -> &dyn RecordCodec {
        self.codec.as_ref()
    }

    #[must_use]
    pub fn cache(&self) -> &CacheIndex {
        &self.cache
    }

    /// Discards the advisory index. Subsequent lookups rebuild it by rescanning.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn with_lock<T>(&self, body: impl Future<Output = Result<T>>) -> Result<T> {
        let guard = self.lock.acquire().await?;
        let result = body.await;
        guard.release_with(result).await
    }

    /// Children of `folder`, or nothing if the folder does not exist.
    async fn entries(&self, folder: &Path) -> Result<Vec<FileEntry>> {
        match self.fs.children(folder).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e).context(format!("Failed to list {}", folder.display())),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.fs.exists(path).await.context(format!("Existence check failed: {}", path.display()))
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
