use super::{MetaStore, same_name};
use crate::error::{MetaStoreError, MetaStoreErrorExt, Result};
use mstore_domain::{ElementType, Record, RecordKind};
use mstore_vfs::FileSystem;
use tracing::debug;

impl<F: FileSystem> MetaStore<F> {
    /// Every element type of a namespace. Folders without a type document are skipped.
    pub async fn list_element_types(&self, namespace: &str) -> Result<Vec<ElementType>> {
        self.with_lock(self.list_element_types_unlocked(namespace)).await
    }

    /// Folder names of a namespace's element types, without reading any document.
    pub async fn list_element_type_ids(&self, namespace: &str) -> Result<Vec<String>> {
        self.with_lock(self.list_element_type_ids_unlocked(namespace)).await
    }

    /// The element type stored under `id`, stamped with this store's name.
    pub async fn element_type(&self, namespace: &str, id: &str) -> Result<Option<ElementType>> {
        self.with_lock(self.element_type_unlocked(namespace, id)).await
    }

    /// First element type whose name matches case-insensitively.
    ///
    /// Types have no name index; this is a scan over [`MetaStore::list_element_types`].
    pub async fn element_type_by_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ElementType>> {
        self.with_lock(async {
            let types = self.list_element_types_unlocked(namespace).await?;
            Ok(types.into_iter().find(|t| same_name(&t.name, name)))
        })
        .await
    }

    /// Stores a new element type and returns the stored handle.
    ///
    /// The id defaults to the name; an explicit id must equal it.
    ///
    /// # Errors
    /// - [`MetaStoreError::NotFound`] if the namespace does not exist.
    /// - [`MetaStoreError::ElementTypeExists`] carrying the namespace's current types.
    pub async fn create_element_type(
        &self,
        namespace: &str,
        element_type: ElementType,
    ) -> Result<ElementType> {
        self.with_lock(self.create_element_type_unlocked(namespace, element_type)).await
    }

    /// Rewrites an existing element type in place.
    ///
    /// # Errors
    /// [`MetaStoreError::NotFound`] if the type folder does not exist.
    pub async fn update_element_type(
        &self,
        namespace: &str,
        element_type: ElementType,
    ) -> Result<ElementType> {
        self.with_lock(self.update_element_type_unlocked(namespace, element_type)).await
    }

    /// Removes an element type that has no elements. Absent types are ignored.
    ///
    /// # Errors
    /// [`MetaStoreError::DependencyExists`] with the ids of the remaining elements. Any element
    /// that cannot be decoded aborts the deletion.
    pub async fn delete_element_type(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> Result<()> {
        self.with_lock(self.delete_element_type_unlocked(namespace, element_type)).await
    }

    pub(super) async fn list_element_type_ids_unlocked(&self, namespace: &str) -> Result<Vec<String>> {
        let folder = self.paths.namespace_folder(namespace)?;
        let entries = self.entries(&folder).await?;
        Ok(entries.into_iter().filter(|e| e.is_folder() && !e.hidden).map(|e| e.name).collect())
    }

    async fn list_element_types_unlocked(&self, namespace: &str) -> Result<Vec<ElementType>> {
        let ids = self.list_element_type_ids_unlocked(namespace).await?;
        let mut types = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(t) = self.element_type_unlocked(namespace, &id).await? {
                types.push(t);
            }
        }
        Ok(types)
    }

    pub(super) async fn element_type_unlocked(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<Option<ElementType>> {
        let path = self.paths.type_document(namespace, id)?;
        let bytes = match self.fs.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context(format!("Unable to read element type '{namespace}/{id}'")),
        };

        let mut element_type = self
            .codec
            .decode(RecordKind::ElementType, &bytes)
            .context(format!("element type '{namespace}/{id}'"))?
            .into_element_type()
            .ok_or_else(|| MetaStoreError::Internal {
                message: "codec returned an element for an element-type document".into(),
                context: None,
            })?;

        element_type.id = Some(id.to_owned());
        element_type.namespace = namespace.to_owned();
        element_type.stamp(self.name.as_str());
        self.cache.register_type_id(namespace, &element_type.name, id);
        Ok(Some(element_type))
    }

    async fn create_element_type_unlocked(
        &self,
        namespace: &str,
        element_type: ElementType,
    ) -> Result<ElementType> {
        let id = file_backed_id(&element_type)?;
        let folder = self.paths.type_folder(namespace, &id)?;
        let document = self.paths.type_document(namespace, &id)?;

        if !self.namespace_exists_unlocked(namespace).await? {
            return Err(MetaStoreError::not_found(format!("namespace '{namespace}'")));
        }
        if self.exists(&folder).await? && self.exists(&document).await? {
            let existing = self.list_element_types_unlocked(namespace).await?;
            return Err(MetaStoreError::ElementTypeExists { id, existing, context: None });
        }

        self.fs
            .create_folder(&folder)
            .await
            .context(format!("Unable to create element type folder '{namespace}/{id}'"))?;
        let stored = self.save_element_type(namespace, &id, element_type).await?;
        debug!(namespace, id, "Element type created");
        Ok(stored)
    }

    async fn update_element_type_unlocked(
        &self,
        namespace: &str,
        element_type: ElementType,
    ) -> Result<ElementType> {
        let id = file_backed_id(&element_type)?;
        let folder = self.paths.type_folder(namespace, &id)?;
        if !self.exists(&folder).await? {
            return Err(MetaStoreError::not_found(format!("element type '{namespace}/{id}'")));
        }

        let stored = self.save_element_type(namespace, &id, element_type).await?;
        debug!(namespace, id, "Element type updated");
        Ok(stored)
    }

    async fn save_element_type(
        &self,
        namespace: &str,
        id: &str,
        mut element_type: ElementType,
    ) -> Result<ElementType> {
        let document = self.paths.type_document(namespace, id)?;
        element_type.id = Some(id.to_owned());
        element_type.namespace = namespace.to_owned();

        let bytes = self.codec.encode(&Record::ElementType(element_type.clone())).map_err(|source| {
            MetaStoreError::Encode {
                source,
                context: Some(format!("element type '{namespace}/{id}'").into()),
            }
        })?;
        self.fs
            .write(&document, &bytes)
            .await
            .context(format!("Unable to write element type '{namespace}/{id}'"))?;

        self.cache.register_type_id(namespace, &element_type.name, id);
        let modified = self
            .fs
            .last_modified(&document)
            .await
            .context(format!("Unable to stat element type '{namespace}/{id}'"))?;
        self.cache.mark_processed(&document, modified);

        element_type.stamp(self.name.as_str());
        Ok(element_type)
    }

    async fn delete_element_type_unlocked(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> Result<()> {
        let id = element_type.name.as_str();
        let folder = self.paths.type_folder(namespace, id)?;
        let document = self.paths.type_document(namespace, id)?;
        if !self.exists(&document).await? {
            return Ok(());
        }

        let dependencies: Vec<String> = self
            .list_elements_unlocked(namespace, id, None)
            .await?
            .into_iter()
            .filter_map(|e| e.id)
            .collect();
        if !dependencies.is_empty() {
            return Err(MetaStoreError::dependencies(
                format!("element type '{namespace}/{id}' still holds elements"),
                dependencies,
            ));
        }

        if !self.fs.delete(&document).await.context(format!("Unable to delete '{namespace}/{id}'"))? {
            return Err(MetaStoreError::storage_refused(format!(
                "element type document '{namespace}/{id}' could not be removed"
            )));
        }
        if !self.fs.delete(&folder).await.context(format!("Unable to delete '{namespace}/{id}'"))? {
            return Err(MetaStoreError::storage_refused(format!(
                "element type folder '{namespace}/{id}' could not be removed, check that it is empty"
            )));
        }

        self.cache.unregister_type_id(namespace, id);
        self.cache.unmark_processed(&document);
        debug!(namespace, id, "Element type deleted");
        Ok(())
    }
}

/// File-backed identity: the id is the name.
fn file_backed_id(element_type: &ElementType) -> Result<String> {
    match element_type.id.as_deref() {
        None => Ok(element_type.name.clone()),
        Some(id) if id == element_type.name => Ok(id.to_owned()),
        Some(id) => Err(MetaStoreError::invalid_name(format!(
            "element type id '{id}' must equal its name '{}'",
            element_type.name
        ))),
    }
}
