#![allow(dead_code)]

use mstore::MetaStore;
use mstore::domain::config::LockConfig;
use mstore::domain::{Element, ElementType};
use mstore::vfs::{FileSystem, LocalFileSystem, MemoryFileSystem};
use std::path::PathBuf;
use tempfile::TempDir;

pub const FAST_LOCK: LockConfig = LockConfig { poll_interval_ms: 5, timeout_ms: 5_000 };

pub async fn memory_store() -> MetaStore<MemoryFileSystem> {
    open(MemoryFileSystem::new()).await
}

pub async fn local_store() -> (TempDir, MetaStore<LocalFileSystem>) {
    let temp = TempDir::new().unwrap();
    let fs = LocalFileSystem::builder().root(temp.path()).connect().await.unwrap();
    (temp, open(fs).await)
}

pub async fn open<F: FileSystem>(fs: F) -> MetaStore<F> {
    MetaStore::builder().filesystem(fs).lock(FAST_LOCK).open().await.unwrap()
}

/// Namespace `etl` with element type `jobs`.
pub async fn with_jobs<F: FileSystem>(store: &MetaStore<F>) -> ElementType {
    store.create_namespace("etl").await.unwrap();
    store
        .create_element_type("etl", ElementType::new("etl", "jobs").with_description("Batch jobs"))
        .await
        .unwrap()
}

pub fn job(name: &str) -> Element {
    Element::new(name).with_value(format!("run {name}"))
}

pub fn element_path<F: FileSystem>(store: &MetaStore<F>, id: &str) -> PathBuf {
    store.paths().element_document("etl", "jobs", id).unwrap()
}

/// Writes an element document behind the store's back.
pub async fn write_external<F: FileSystem>(store: &MetaStore<F>, file_stem: &str, element: Element) {
    let bytes = store.codec().encode(&element.into()).unwrap();
    store.filesystem().write(&element_path(store, file_stem), &bytes).await.unwrap();
}

pub fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

/// Runs each listed `async fn(MetaStore<F>)` against the in-memory and the local backend.
#[allow(unused_macros)]
macro_rules! on_backends {
    ($($name:ident),* $(,)?) => {
        mod on_memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(crate::common::memory_store().await).await;
                }
            )*
        }

        mod on_local {
            $(
                #[tokio::test]
                async fn $name() {
                    let (_temp, store) = crate::common::local_store().await;
                    super::$name(store).await;
                }
            )*
        }
    };
}
