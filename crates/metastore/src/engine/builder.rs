use super::{MetaStore, MetaStoreInner};
use crate::cache::CacheIndex;
use crate::codec::{RecordCodec, codec_for};
use crate::error::{MetaStoreError, MetaStoreErrorExt, Result};
use crate::lock::StoreLock;
use crate::path::PathConvention;
use mstore_domain::config::{CodecKind, DEFAULT_META_FOLDER, LockConfig, StoreConfig};
use mstore_vfs::FileSystem;
use private::Sealed;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
struct StoreSettings {
    name: Option<String>,
    meta_folder: PathBuf,
    codec: Arc<dyn RecordCodec>,
    lock: LockConfig,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            name: None,
            meta_folder: PathBuf::from(DEFAULT_META_FOLDER),
            codec: codec_for(CodecKind::default()),
            lock: LockConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct NoFs;
#[derive(Debug)]
pub struct WithFs<F>(F);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoFs {}
impl<F: mstore_vfs::FileSystem> Sealed for WithFs<F> {}

/// Typestate builder: a filesystem must be supplied before [`MetaStoreBuilder::open`] exists.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct MetaStoreBuilder<F: FileSystem, S: Sealed = NoFs> {
    state: S,
    settings: StoreSettings,
    _fs: PhantomData<F>,
}

impl<F: FileSystem> Default for MetaStoreBuilder<F, NoFs> {
    fn default() -> Self {
        Self { state: NoFs, settings: StoreSettings::default(), _fs: PhantomData }
    }
}

#[allow(private_bounds)]
impl<F: FileSystem, S: Sealed> MetaStoreBuilder<F, S> {
    /// Overrides the store name. Defaults to `metastore:<filesystem uri>`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    /// Folder under the filesystem root that holds every namespace.
    #[must_use]
    pub fn meta_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.settings.meta_folder = folder.into();
        self
    }

    #[must_use]
    pub fn codec(mut self, kind: CodecKind) -> Self {
        self.settings.codec = codec_for(kind);
        self
    }

    /// Uses a codec that is not one of the built-in [`CodecKind`]s.
    #[must_use]
    pub fn custom_codec(mut self, codec: Arc<dyn RecordCodec>) -> Self {
        self.settings.codec = codec;
        self
    }

    #[must_use]
    pub fn lock(mut self, lock: LockConfig) -> Self {
        self.settings.lock = lock;
        self
    }

    /// Applies every knob of a [`StoreConfig`] at once.
    #[must_use]
    pub fn config(self, config: &StoreConfig) -> Self {
        let mut this = self.meta_folder(&config.meta_folder).codec(config.codec).lock(config.lock);
        if let Some(name) = &config.name {
            this = this.name(name.clone());
        }
        this
    }
}

impl<F: FileSystem> MetaStoreBuilder<F, NoFs> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filesystem(self, fs: F) -> MetaStoreBuilder<F, WithFs<F>> {
        MetaStoreBuilder { state: WithFs(fs), settings: self.settings, _fs: PhantomData }
    }
}

impl<F: FileSystem> MetaStoreBuilder<F, WithFs<F>> {
    /// Opens the store, creating the meta folder if it does not exist yet.
    ///
    /// # Errors
    /// [`MetaStoreError::InvalidName`] for a meta folder that is empty or not a plain relative
    /// path, [`MetaStoreError::Storage`] if the folder cannot be created.
    pub async fn open(self) -> Result<MetaStore<F>> {
        let fs = self.state.0;
        let StoreSettings { name, meta_folder, codec, lock } = self.settings;

        validate_meta_folder(&meta_folder)?;
        fs.create_folder(&meta_folder)
            .await
            .context(format!("Unable to create meta folder {}", meta_folder.display()))?;

        let name = name.unwrap_or_else(|| format!("metastore:{}", fs.uri()));
        let paths = PathConvention::new(&meta_folder, codec.extension(), codec.type_file_name());
        let lock = StoreLock::new(fs.clone(), paths.lock_file(), &lock);

        info!(store = %name, meta = %meta_folder.display(), ext = codec.extension(), "Metastore opened");

        Ok(MetaStore {
            inner: Arc::new(MetaStoreInner {
                fs,
                name,
                paths,
                codec,
                cache: CacheIndex::new(),
                lock,
            }),
        })
    }
}

fn validate_meta_folder(folder: &Path) -> Result<()> {
    let plain = folder.components().all(|c| matches!(c, Component::Normal(_)));
    if folder.as_os_str().is_empty() || !plain {
        return Err(MetaStoreError::invalid_name(format!(
            "meta folder '{}' must be a non-empty relative path",
            folder.display()
        )));
    }
    Ok(())
}
