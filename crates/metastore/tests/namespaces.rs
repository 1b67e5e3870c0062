#[macro_use]
mod common;

use common::*;
use mstore::domain::ElementType;
use mstore::vfs::FileSystem;
use mstore::{MetaStore, MetaStoreError};
use std::path::Path;

async fn created_namespaces_are_listed<F: FileSystem>(store: MetaStore<F>) {
    assert!(store.list_namespaces().await.unwrap().is_empty());

    store.create_namespace("etl").await.unwrap();
    store.create_namespace("reports").await.unwrap();

    assert_eq!(sorted(store.list_namespaces().await.unwrap()), vec!["etl", "reports"]);
    assert!(store.namespace_exists("etl").await.unwrap());
    assert!(!store.namespace_exists("missing").await.unwrap());

    store.delete_namespace("etl").await.unwrap();
    assert_eq!(store.list_namespaces().await.unwrap(), vec!["reports"]);
}

async fn duplicate_namespace_is_refused<F: FileSystem>(store: MetaStore<F>) {
    let jobs = with_jobs(&store).await;
    store.create_element("etl", &jobs, job("nightly")).await.unwrap();

    let err = store.create_namespace("etl").await.unwrap_err();
    assert!(matches!(err, MetaStoreError::NamespaceExists { ref namespace, .. } if namespace == "etl"));

    assert_eq!(store.list_element_type_ids("etl").await.unwrap(), vec!["jobs"]);
    assert_eq!(store.list_element_ids("etl", &jobs).await.unwrap(), vec!["nightly"]);
}

async fn namespace_with_types_is_not_deleted<F: FileSystem>(store: MetaStore<F>) {
    with_jobs(&store).await;
    store.create_element_type("etl", ElementType::new("etl", "connections")).await.unwrap();

    let err = store.delete_namespace("etl").await.unwrap_err();
    let ids = err.dependency_ids().expect("dependency error").to_vec();
    assert_eq!(sorted(ids), vec!["connections", "jobs"]);
    assert!(store.namespace_exists("etl").await.unwrap());
}

async fn deleting_an_absent_namespace_is_a_no_op<F: FileSystem>(store: MetaStore<F>) {
    store.delete_namespace("ghost").await.unwrap();
}

async fn hidden_entries_and_lock_are_not_namespaces<F: FileSystem>(store: MetaStore<F>) {
    store.create_namespace("etl").await.unwrap();
    let meta = store.meta_folder().to_path_buf();
    store.filesystem().create_folder(&meta.join(".trash")).await.unwrap();
    store.filesystem().write(&meta.join("stray.txt"), b"x").await.unwrap();

    assert_eq!(store.list_namespaces().await.unwrap(), vec!["etl"]);
}

async fn invalid_names_fail_before_io<F: FileSystem>(store: MetaStore<F>) {
    for bad in ["", "..", ".hidden", "a/b", "a\\b"] {
        let err = store.create_namespace(bad).await.unwrap_err();
        assert!(matches!(err, MetaStoreError::InvalidName { .. }), "{bad:?}: {err}");
    }
    assert!(store.list_namespaces().await.unwrap().is_empty());
}

async fn lock_marker_is_released_on_errors<F: FileSystem>(store: MetaStore<F>) {
    store.create_namespace("etl").await.unwrap();
    assert!(store.create_namespace("etl").await.is_err());

    let marker = store.paths().lock_file();
    assert_eq!(marker, Path::new("metastore/.lock"));
    assert!(!store.filesystem().exists(&marker).await.unwrap());
}

on_backends!(
    created_namespaces_are_listed,
    duplicate_namespace_is_refused,
    namespace_with_types_is_not_deleted,
    deleting_an_absent_namespace_is_a_no_op,
    hidden_entries_and_lock_are_not_namespaces,
    invalid_names_fail_before_io,
    lock_marker_is_released_on_errors,
);
