use mstore_vfs::*;
use std::path::Path;
use tempfile::TempDir;

async fn local() -> (TempDir, LocalFileSystem) {
    let temp = TempDir::new().unwrap();
    let fs = LocalFileSystem::builder().root(temp.path()).connect().await.unwrap();
    (temp, fs)
}

async fn traversal_is_rejected(fs: &impl FileSystem) {
    assert!(matches!(fs.resolve(Path::new("../etc/passwd")), Err(VfsError::PathTraversal { .. })));
    assert!(matches!(fs.resolve(Path::new("a/../../b")), Err(VfsError::PathTraversal { .. })));
    assert!(fs.read(Path::new("/etc/passwd")).await.is_err());
    assert!(fs.resolve(Path::new("a/../b")).is_ok());
}

async fn create_new_is_exclusive(fs: &impl FileSystem) {
    assert!(fs.create_new(Path::new("meta/.lock"), b"first").await.unwrap());
    assert!(!fs.create_new(Path::new("meta/.lock"), b"second").await.unwrap());
    assert_eq!(fs.read(Path::new("meta/.lock")).await.unwrap(), b"first");
}

async fn delete_semantics(fs: &impl FileSystem) {
    fs.write(Path::new("ns/type/item.xml"), b"<element/>").await.unwrap();

    assert!(!fs.delete(Path::new("ns/type")).await.unwrap(), "non-empty folder must survive");
    assert!(fs.exists(Path::new("ns/type/item.xml")).await.unwrap());

    assert!(fs.delete(Path::new("ns/type/item.xml")).await.unwrap());
    assert!(!fs.delete(Path::new("ns/type/item.xml")).await.unwrap(), "second delete is a no-op");
    assert!(fs.delete(Path::new("ns/type")).await.unwrap());
    assert!(fs.delete(Path::new("ns")).await.unwrap());
    assert!(!fs.exists(Path::new("ns")).await.unwrap());
}

async fn children_report_kind_and_hidden(fs: &impl FileSystem) {
    fs.create_folder(Path::new("root/empty")).await.unwrap();
    fs.write(Path::new("root/.type.xml"), b"t").await.unwrap();
    fs.write(Path::new("root/a.xml"), b"a").await.unwrap();
    fs.write(Path::new("root/empty-not/deep.xml"), b"d").await.unwrap();

    let mut children = fs.children(Path::new("root")).await.unwrap();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    let summary: Vec<_> = children.iter().map(|c| (c.name.as_str(), c.kind, c.hidden)).collect();
    assert_eq!(
        summary,
        vec![
            (".type.xml", EntryKind::File, true),
            ("a.xml", EntryKind::File, false),
            ("empty", EntryKind::Folder, false),
            ("empty-not", EntryKind::Folder, false),
        ]
    );

    let err = fs.children(Path::new("missing")).await.unwrap_err();
    assert!(err.is_not_found());
}

async fn read_missing_is_not_found(fs: &impl FileSystem) {
    assert!(fs.read(Path::new("nope.xml")).await.unwrap_err().is_not_found());
    assert!(fs.last_modified(Path::new("nope.xml")).await.unwrap_err().is_not_found());
}

async fn write_replaces_and_advances_time(fs: &impl FileSystem) {
    let path = Path::new("doc/a.xml");
    fs.write(path, b"v1").await.unwrap();
    let first = fs.last_modified(path).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    fs.write(path, b"v2").await.unwrap();
    let second = fs.last_modified(path).await.unwrap();

    assert_eq!(fs.read(path).await.unwrap(), b"v2");
    assert!(second >= first);

    let names: Vec<_> =
        fs.children(Path::new("doc")).await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["a.xml".to_owned()], "no temp files may linger");
}

macro_rules! contract {
    ($($name:ident),* $(,)?) => {
        mod on_local {
            $(
                #[tokio::test]
                async fn $name() {
                    let (_temp, fs) = super::local().await;
                    super::$name(&fs).await;
                }
            )*
        }

        mod on_memory {
            $(
                #[tokio::test]
                async fn $name() {
                    let fs = mstore_vfs::MemoryFileSystem::new();
                    super::$name(&fs).await;
                }
            )*
        }
    };
}

contract!(
    traversal_is_rejected,
    create_new_is_exclusive,
    delete_semantics,
    children_report_kind_and_hidden,
    read_missing_is_not_found,
    write_replaces_and_advances_time,
);

#[tokio::test]
async fn test_connect_without_create_fails_on_missing_root() {
    let temp = TempDir::new().unwrap();
    let result =
        LocalFileSystem::builder().root(temp.path().join("absent")).create(false).connect().await;
    assert!(matches!(result, Err(VfsError::Io { .. })));
}

#[tokio::test]
async fn test_uri_reflects_backend() {
    let (_temp, fs) = local().await;
    assert!(fs.uri().starts_with("file://"));
    assert_eq!(MemoryFileSystem::with_label("unit").uri(), "memory://unit");
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_blocked() {
    let outside = TempDir::new().unwrap();
    let (temp, fs) = local().await;
    std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();

    assert!(matches!(fs.resolve(Path::new("link/secret")), Err(VfsError::PathTraversal { .. })));
}

/// Writes a temp-file leftover aged `age_secs` under `ns/`.
fn leftover(temp: &TempDir, age_secs: u64) -> std::path::PathBuf {
    let path = temp.path().join("ns").join(".a.xml.vfstmp.1.1");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"partial").unwrap();
    let old = std::time::SystemTime::now() - std::time::Duration::from_secs(age_secs);
    std::fs::File::options().write(true).open(&path).unwrap().set_modified(old).unwrap();
    path
}

#[tokio::test]
async fn test_stale_tmp_purged_on_connect() {
    let temp = TempDir::new().unwrap();
    let leftover = leftover(&temp, 3600);

    let _fs = LocalFileSystem::builder().root(temp.path()).connect().await.unwrap();

    assert!(!leftover.exists());
    assert!(temp.path().join("ns").exists());
}

#[tokio::test]
async fn test_staleness_threshold_is_configurable() {
    let temp = TempDir::new().unwrap();
    let recent = leftover(&temp, 60);

    let fs = LocalFileSystem::builder().root(temp.path()).connect().await.unwrap();
    assert!(recent.exists(), "younger than the default threshold");

    let fs_strict = LocalFileSystem::builder()
        .stale_tmp_after(std::time::Duration::from_secs(10))
        .root(temp.path())
        .connect()
        .await
        .unwrap();
    assert!(!recent.exists());
    assert_eq!(fs_strict.purge_tmp().await, 0);
    assert_eq!(fs.purge_tmp().await, 0);
}

#[tokio::test]
async fn test_purge_can_be_deferred() {
    let temp = TempDir::new().unwrap();
    let stale = leftover(&temp, 3600);

    let fs =
        LocalFileSystem::builder().root(temp.path()).purge_on_connect(false).connect().await.unwrap();
    assert!(stale.exists());
    assert_eq!(fs.purge_tmp().await, 1);
    assert!(!stale.exists());
}

#[tokio::test]
async fn test_root_must_be_a_directory() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain.txt");
    std::fs::write(&file, b"x").unwrap();

    let result = LocalFileSystem::builder().root(&file).create(false).connect().await;
    assert!(matches!(result, Err(VfsError::Io { .. })));
}
