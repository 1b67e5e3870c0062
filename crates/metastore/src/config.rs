use crate::error::{MetaStoreErrorExt, Result};
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides, e.g. `MSTORE__STORE__CODEC=json`.
pub const ENV_PREFIX: &str = "MSTORE";

/// Loads a configuration by layering an optional file with environment overrides.
///
/// 1. **Base file**: TOML, JSON or YAML, detected from the extension. The file is required when
///    a path is given.
/// 2. **Environment**: variables prefixed with `MSTORE__`; nested keys are separated by `__`
///    (`MSTORE__STORE__LOCK__TIMEOUT_MS` maps to `store.lock.timeout_ms`).
///
/// Missing keys fall back to the target type's `#[serde(default)]` values.
///
/// # Example
/// ```rust
/// use mstore::config::load_config;
/// use mstore_domain::config::AppConfig;
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// assert_eq!(cfg.store.meta_folder, "metastore");
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path.as_ref().map(AsRef::as_ref) {
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
