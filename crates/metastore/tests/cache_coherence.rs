#[macro_use]
mod common;

use common::*;
use mstore::MetaStore;
use mstore::domain::Element;
use mstore::vfs::FileSystem;

async fn lookup_by_name_uses_and_fills_the_cache<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("Nightly")).await.unwrap();
    assert_eq!(store.cache().lookup_element_id("etl", "jobs", "nightly").as_deref(), Some("Nightly"));

    let found = store.element_by_name("etl", &jobs, "NIGHTLY").await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some("Nightly"));
}

async fn recreated_name_under_new_id_is_found<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("job")).await.unwrap();
    let first = store.element_by_name("etl", &jobs, "job").await.unwrap().unwrap();
    assert_eq!(first.id.as_deref(), Some("job"));

    // Another process swaps the document for one with the same name under a new id.
    store.filesystem().delete(&element_path(&store, "job")).await.unwrap();
    write_external(&store, "job-v2", Element::new("job").with_value("replacement")).await;

    let second = store.element_by_name("etl", &jobs, "job").await.unwrap().unwrap();
    assert_eq!(second.id.as_deref(), Some("job-v2"));
    assert_eq!(second.value.as_deref(), Some("replacement"));
    assert_eq!(store.cache().lookup_element_id("etl", "jobs", "job").as_deref(), Some("job-v2"));
}

async fn renamed_document_is_not_returned_for_old_name<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("alpha")).await.unwrap();
    assert!(store.element_by_name("etl", &jobs, "alpha").await.unwrap().is_some());

    write_external(&store, "alpha", Element::new("beta")).await;

    assert!(store.element_by_name("etl", &jobs, "alpha").await.unwrap().is_none());
    let beta = store.element_by_name("etl", &jobs, "beta").await.unwrap().unwrap();
    assert_eq!(beta.id.as_deref(), Some("alpha"));
}

async fn externally_added_element_is_found_by_scan<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("a")).await.unwrap();
    write_external(&store, "b", job("b")).await;

    let b = store.element_by_name("etl", &jobs, "b").await.unwrap().unwrap();
    assert_eq!(b.id.as_deref(), Some("b"));
}

async fn scan_survives_corrupt_documents<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.filesystem().write(&element_path(&store, "aaa"), b"<element>").await.unwrap();
    write_external(&store, "zzz", job("target")).await;

    let found = store.element_by_name("etl", &jobs, "target").await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some("zzz"));
}

async fn cleared_cache_is_rebuilt_by_rescan<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("nightly")).await.unwrap();

    store.clear_cache();
    assert_eq!(store.cache().stats(), mstore::CacheStats::default());

    let found = store.element_by_name("etl", &jobs, "nightly").await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some("nightly"));
    assert_eq!(store.cache().stats().elements, 1);
}

async fn delete_forgets_cached_association<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("nightly")).await.unwrap();
    store.delete_element("etl", &jobs, "nightly").await.unwrap();

    assert_eq!(store.cache().lookup_element_id("etl", "jobs", "nightly"), None);
    let stats = store.cache().stats();
    assert_eq!(stats.elements, 0);
    assert_eq!(stats.processed, 1, "only the type document stays marked");
}

on_backends!(
    lookup_by_name_uses_and_fills_the_cache,
    recreated_name_under_new_id_is_found,
    renamed_document_is_not_returned_for_old_name,
    externally_added_element_is_found_by_scan,
    scan_survives_corrupt_documents,
    cleared_cache_is_rebuilt_by_rescan,
    delete_forgets_cached_association,
);
