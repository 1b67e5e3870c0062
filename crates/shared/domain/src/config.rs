use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Folder created under the filesystem root to hold every namespace.
pub const DEFAULT_META_FOLDER: &str = "metastore";

/// Top-level configuration of the `mstore` application.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfigInner {
    /// Filesystem root the store lives in.
    pub root: PathBuf,
    /// Create the root directory when it does not exist.
    pub create: bool,
    pub store: StoreConfig,
    pub log: LogConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(flatten, default)]
    inner: Arc<AppConfigInner>,
}

impl Deref for AppConfig {
    type Target = AppConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AppConfig {
    fn deref_mut(&mut self) -> &mut AppConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Store engine knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name stamped onto element-type handles. Derived from the filesystem URI when absent.
    pub name: Option<String>,
    pub meta_folder: String,
    pub codec: CodecKind,
    pub lock: LockConfig,
}

/// Bounded-retry advisory lock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl LockConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Document encoding used for records on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Xml,
    Json,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => f.write_str("xml"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown codec '{other}' (expected 'xml' or 'json')")),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for rolling log files. Console only when absent.
    pub directory: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for AppConfigInner {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            create: true,
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: None,
            meta_folder: DEFAULT_META_FOLDER.to_owned(),
            codec: CodecKind::default(),
            lock: LockConfig::default(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 100, timeout_ms: 10_000 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), directory: None, json: false }
    }
}
