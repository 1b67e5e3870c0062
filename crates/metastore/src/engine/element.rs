use super::{MetaStore, same_name};
use crate::error::{MetaStoreError, MetaStoreErrorExt, Result};
use mstore_domain::{Element, ElementType, Record, RecordKind};
use mstore_vfs::FileSystem;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

impl<F: FileSystem> MetaStore<F> {
    /// Every element of a type. The first document that fails to load aborts the listing.
    pub async fn list_elements(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> Result<Vec<Element>> {
        self.with_lock(self.list_elements_unlocked(namespace, &element_type.name, None)).await
    }

    /// Every loadable element of a type.
    ///
    /// Documents that fail to load are appended to `errors` (with the element id as context)
    /// and skipped.
    pub async fn list_elements_collecting(
        &self,
        namespace: &str,
        element_type: &ElementType,
        errors: &mut Vec<MetaStoreError>,
    ) -> Result<Vec<Element>> {
        self.with_lock(self.list_elements_unlocked(namespace, &element_type.name, Some(errors)))
            .await
    }

    /// Element ids derived from file names, without decoding anything.
    pub async fn list_element_ids(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> Result<Vec<String>> {
        self.with_lock(async {
            let documents = self.element_documents(namespace, &element_type.name).await?;
            Ok(documents.into_iter().map(|(id, _)| id).collect())
        })
        .await
    }

    pub async fn element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        id: &str,
    ) -> Result<Option<Element>> {
        self.with_lock(async {
            let path = self.paths.element_document(namespace, &element_type.name, id)?;
            self.load_element(namespace, &element_type.name, id, &path).await
        })
        .await
    }

    /// First element whose name matches case-insensitively.
    ///
    /// A cached name-to-id association is confirmed against the decoded document before it is
    /// trusted; otherwise the type folder is scanned.
    pub async fn element_by_name(
        &self,
        namespace: &str,
        element_type: &ElementType,
        name: &str,
    ) -> Result<Option<Element>> {
        self.with_lock(self.element_by_name_unlocked(namespace, &element_type.name, name)).await
    }

    /// Stores a new element and returns it with its file-backed id.
    ///
    /// # Errors
    /// - [`MetaStoreError::NotFound`] if the element type does not exist.
    /// - [`MetaStoreError::ElementExists`] carrying the type's current elements.
    pub async fn create_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element: Element,
    ) -> Result<Element> {
        self.with_lock(self.create_element_unlocked(namespace, &element_type.name, element)).await
    }

    /// Rewrites the element stored under `id`.
    ///
    /// # Errors
    /// - [`MetaStoreError::ForeignElementType`] if `element_type` was not obtained from this
    ///   store. Nothing is written.
    /// - [`MetaStoreError::InvalidName`] if `id` differs from the element's name.
    /// - [`MetaStoreError::NotFound`] if no such element exists.
    pub async fn update_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        id: &str,
        element: Element,
    ) -> Result<Element> {
        if !element_type.is_bound_to(&self.name) {
            return Err(MetaStoreError::ForeignElementType {
                message: format!(
                    "element type '{}' belongs to {}, re-acquire it from {}",
                    element_type.name,
                    element_type.store_name().unwrap_or("no store"),
                    self.name
                )
                .into(),
                context: None,
            });
        }
        self.with_lock(self.update_element_unlocked(namespace, &element_type.name, id, element))
            .await
    }

    /// Removes an element. Absent elements are ignored.
    pub async fn delete_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        id: &str,
    ) -> Result<()> {
        self.with_lock(self.delete_element_unlocked(namespace, &element_type.name, id)).await
    }

    /// `(id, path)` of every element document in a type folder.
    async fn element_documents(
        &self,
        namespace: &str,
        type_name: &str,
    ) -> Result<Vec<(String, PathBuf)>> {
        let folder = self.paths.type_folder(namespace, type_name)?;
        let entries = self.entries(&folder).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_file() && !e.hidden)
            .filter_map(|e| {
                let id = self.paths.element_id(&e.name)?.to_owned();
                let path = folder.join(&e.name);
                Some((id, path))
            })
            .collect())
    }

    pub(super) async fn list_elements_unlocked(
        &self,
        namespace: &str,
        type_name: &str,
        mut errors: Option<&mut Vec<MetaStoreError>>,
    ) -> Result<Vec<Element>> {
        let documents = self.element_documents(namespace, type_name).await?;
        let mut elements = Vec::with_capacity(documents.len());

        for (id, path) in documents {
            match self.load_element(namespace, type_name, &id, &path).await {
                Ok(Some(element)) => elements.push(element),
                Ok(None) => {},
                Err(e) => {
                    let e = e.with_context(format!("Could not load element '{id}'"));
                    let Some(errors) = errors.as_deref_mut() else {
                        return Err(e);
                    };
                    warn!(namespace, element_type = type_name, id, error = %e, "Skipping unreadable element");
                    errors.push(e);
                },
            }
        }
        Ok(elements)
    }

    /// Decodes one element document and refreshes its cache entries.
    async fn load_element(
        &self,
        namespace: &str,
        type_name: &str,
        id: &str,
        path: &Path,
    ) -> Result<Option<Element>> {
        let modified = match self.fs.last_modified(path).await {
            Ok(modified) => modified,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context(format!("Unable to stat element '{id}'")),
        };
        let bytes = match self.fs.read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context(format!("Unable to read element '{id}'")),
        };

        let mut element = self
            .codec
            .decode(RecordKind::Element, &bytes)
            .context(format!("element '{namespace}/{type_name}/{id}'"))?
            .into_element()
            .ok_or_else(|| MetaStoreError::Internal {
                message: "codec returned an element type for an element document".into(),
                context: None,
            })?;
        element.id = Some(id.to_owned());

        self.cache.register_element_id(namespace, type_name, &element.name, id);
        self.cache.mark_processed(path, modified);
        Ok(Some(element))
    }

    async fn element_by_name_unlocked(
        &self,
        namespace: &str,
        type_name: &str,
        name: &str,
    ) -> Result<Option<Element>> {
        if let Some(id) = self.cache.lookup_element_id(namespace, type_name, name) {
            let path = self.paths.element_document(namespace, type_name, &id)?;
            match self.load_element(namespace, type_name, &id, &path).await {
                Ok(Some(element)) if same_name(&element.name, name) => return Ok(Some(element)),
                Ok(Some(_)) => debug!(namespace, id, "Cached element was renamed, rescanning"),
                Ok(None) => {
                    debug!(namespace, id, "Cached element vanished, rescanning");
                    self.cache.unregister_element_id(namespace, type_name, &id);
                    self.cache.unmark_processed(&path);
                },
                Err(e) => warn!(namespace, id, error = %e, "Cached element unreadable, rescanning"),
            }
        }

        for (id, path) in self.element_documents(namespace, type_name).await? {
            let modified = match self.fs.last_modified(&path).await {
                Ok(modified) => modified,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e).context(format!("Unable to stat element '{id}'")),
            };
            let known_other = self.cache.is_processed(&path, modified)
                && self
                    .cache
                    .cached_element_name(namespace, type_name, &id)
                    .is_some_and(|cached| !same_name(&cached, name));
            if known_other {
                continue;
            }

            match self.load_element(namespace, type_name, &id, &path).await {
                Ok(Some(element)) if same_name(&element.name, name) => return Ok(Some(element)),
                Ok(_) => {},
                Err(e) => warn!(namespace, id, error = %e, "Skipping unreadable element"),
            }
        }
        Ok(None)
    }

    async fn create_element_unlocked(
        &self,
        namespace: &str,
        type_name: &str,
        element: Element,
    ) -> Result<Element> {
        let id = match element.id.as_deref() {
            None => element.name.clone(),
            Some(id) if id == element.name => id.to_owned(),
            Some(id) => {
                return Err(MetaStoreError::invalid_name(format!(
                    "element id '{id}' must equal its name '{}'",
                    element.name
                )));
            },
        };
        let path = self.paths.element_document(namespace, type_name, &id)?;

        let type_document = self.paths.type_document(namespace, type_name)?;
        if !self.exists(&type_document).await? {
            return Err(MetaStoreError::not_found(format!("element type '{namespace}/{type_name}'")));
        }
        if self.exists(&path).await? {
            let mut ignored = Vec::new();
            let existing = self.list_elements_unlocked(namespace, type_name, Some(&mut ignored)).await?;
            return Err(MetaStoreError::ElementExists { id, existing, context: None });
        }

        let stored = self.save_element(namespace, type_name, &id, &path, element).await?;
        debug!(namespace, element_type = type_name, id, "Element created");
        Ok(stored)
    }

    async fn update_element_unlocked(
        &self,
        namespace: &str,
        type_name: &str,
        id: &str,
        element: Element,
    ) -> Result<Element> {
        if id != element.name || element.id.as_deref().is_some_and(|own| own != id) {
            return Err(MetaStoreError::invalid_name(format!(
                "element '{}' cannot be stored under id '{id}'",
                element.name
            )));
        }
        let path = self.paths.element_document(namespace, type_name, id)?;
        if !self.exists(&path).await? {
            return Err(MetaStoreError::not_found(format!("element '{namespace}/{type_name}/{id}'")));
        }

        let stored = self.save_element(namespace, type_name, id, &path, element).await?;
        debug!(namespace, element_type = type_name, id, "Element updated");
        Ok(stored)
    }

    async fn save_element(
        &self,
        namespace: &str,
        type_name: &str,
        id: &str,
        path: &Path,
        mut element: Element,
    ) -> Result<Element> {
        element.id = Some(id.to_owned());
        let bytes = self.codec.encode(&Record::Element(element.clone())).map_err(|source| {
            MetaStoreError::Encode { source, context: Some(format!("element '{id}'").into()) }
        })?;
        self.fs.write(path, &bytes).await.context(format!("Unable to write element '{id}'"))?;

        self.cache.register_element_id(namespace, type_name, &element.name, id);
        let modified =
            self.fs.last_modified(path).await.context(format!("Unable to stat element '{id}'"))?;
        self.cache.mark_processed(path, modified);
        Ok(element)
    }

    async fn delete_element_unlocked(&self, namespace: &str, type_name: &str, id: &str) -> Result<()> {
        let path = self.paths.element_document(namespace, type_name, id)?;
        if !self.exists(&path).await? {
            return Ok(());
        }
        if !self.fs.delete(&path).await.context(format!("Unable to delete element '{id}'"))? {
            return Err(MetaStoreError::storage_refused(format!(
                "element '{namespace}/{type_name}/{id}' could not be removed"
            )));
        }

        self.cache.unregister_element_id(namespace, type_name, id);
        self.cache.unmark_processed(&path);
        debug!(namespace, element_type = type_name, id, "Element deleted");
        Ok(())
    }
}
