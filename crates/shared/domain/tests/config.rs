use mstore_domain::config::{AppConfig, CodecKind, LockConfig, LogConfig, StoreConfig};
use serde_json::json;
use std::time::Duration;

#[test]
fn config_defaults_are_sane() {
    let lock = LockConfig::default();
    assert_eq!(lock.poll_interval(), Duration::from_millis(100));
    assert_eq!(lock.timeout(), Duration::from_secs(10));

    let store = StoreConfig::default();
    assert_eq!(store.meta_folder, "metastore");
    assert_eq!(store.codec, CodecKind::Xml);
    assert!(store.name.is_none());

    let log = LogConfig::default();
    assert_eq!(log.level, "info");
    assert!(log.directory.is_none());

    let app = AppConfig::default();
    assert!(app.create);
    assert_eq!(app.root, std::path::PathBuf::from("."));
}

#[test]
fn app_config_deserializes_partial_documents() {
    let raw = json!({
        "root": "/srv/meta",
        "store": { "name": "primary", "codec": "json", "lock": { "timeout_ms": 250 } },
        "log": { "level": "debug" }
    });

    let cfg: AppConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.root, std::path::PathBuf::from("/srv/meta"));
    assert_eq!(cfg.store.name.as_deref(), Some("primary"));
    assert_eq!(cfg.store.codec, CodecKind::Json);
    assert_eq!(cfg.store.lock.timeout_ms, 250);
    assert_eq!(cfg.store.lock.poll_interval_ms, 100, "missing fields fall back to defaults");
    assert_eq!(cfg.store.meta_folder, "metastore");
    assert_eq!(cfg.log.level, "debug");
}

#[test]
fn app_config_mutation_is_copy_on_write() {
    let original = AppConfig::default();
    let mut changed = original.clone();
    changed.store.meta_folder = "other".to_owned();

    assert_eq!(original.store.meta_folder, "metastore");
    assert_eq!(changed.store.meta_folder, "other");
}

#[test]
fn codec_kind_parses_case_insensitively() {
    assert_eq!("XML".parse::<CodecKind>(), Ok(CodecKind::Xml));
    assert_eq!("json".parse::<CodecKind>(), Ok(CodecKind::Json));
    assert!("yaml".parse::<CodecKind>().is_err());
    assert_eq!(CodecKind::Json.to_string(), "json");
}
