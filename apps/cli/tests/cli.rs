use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn mstore(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mstore").unwrap();
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn no_arguments_prints_help() {
    Command::cargo_bin("mstore")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn full_session_round_trips_through_disk() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    mstore(root).args(["namespace", "create", "etl"]).assert().success();
    mstore(root)
        .args(["type", "create", "etl", "jobs", "--description", "Batch jobs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"description\": \"Batch jobs\""));
    mstore(root)
        .args(["element", "put", "etl", "jobs", "nightly", "--value", "run nightly"])
        .assert()
        .success();

    assert!(root.join("metastore/etl/jobs/.type.xml").is_file());
    assert!(root.join("metastore/etl/jobs/nightly.xml").is_file());

    mstore(root)
        .args(["element", "get", "etl", "jobs", "NIGHTLY"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\": \"run nightly\""));
    mstore(root).args(["element", "list", "etl", "jobs"]).assert().success().stdout("nightly\n");
}

#[test]
fn store_errors_exit_with_failure() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    mstore(root).args(["namespace", "create", "etl"]).assert().success();
    mstore(root)
        .args(["namespace", "create", "etl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("etl"));
    mstore(root)
        .args(["type", "create", "etl", "bad/name"])
        .assert()
        .failure();
}

#[test]
fn namespace_with_types_cannot_be_deleted() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    mstore(root).args(["namespace", "create", "etl"]).assert().success();
    mstore(root).args(["type", "create", "etl", "jobs"]).assert().success();
    mstore(root)
        .args(["namespace", "delete", "etl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jobs"));
    mstore(root).args(["namespace", "exists", "etl"]).assert().success().stdout("true\n");
}

#[test]
fn codec_flag_selects_json_documents() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    mstore(root).args(["--codec", "json", "namespace", "create", "etl"]).assert().success();
    mstore(root).args(["--codec", "json", "type", "create", "etl", "jobs"]).assert().success();

    assert!(root.join("metastore/etl/jobs/.type.json").is_file());
}

#[test]
fn environment_overrides_store_settings() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    mstore(root)
        .env("MSTORE__STORE__META_FOLDER", "catalog")
        .env("MSTORE__STORE__CODEC", "json")
        .args(["namespace", "create", "etl"])
        .assert()
        .success();

    assert!(root.join("catalog/etl").is_dir());
    assert!(!root.join("metastore").exists());
}

#[test]
fn config_file_is_layered_under_flags() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    let config = tmp.path().join("mstore.toml");
    std::fs::write(
        &config,
        format!(
            "root = {:?}\n[store]\nmeta_folder = \"meta\"\ncodec = \"json\"\n",
            tmp.path().join("ignored").display().to_string()
        ),
    )
    .unwrap();

    Command::cargo_bin("mstore")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(&root)
        .args(["--codec", "xml", "namespace", "create", "etl"])
        .assert()
        .success();
    Command::cargo_bin("mstore")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(&root)
        .args(["type", "create", "etl", "jobs"])
        .assert()
        .success();

    assert!(root.join("meta/etl").is_dir());
    assert!(root.join("meta/etl/jobs/.type.json").is_file());
    assert!(!tmp.path().join("ignored").exists());
}

#[test]
fn missing_config_file_fails() {
    let tmp = tempdir().unwrap();
    mstore(tmp.path())
        .arg("--config")
        .arg(tmp.path().join("absent.toml"))
        .args(["namespace", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}
