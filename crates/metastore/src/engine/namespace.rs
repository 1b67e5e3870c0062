use super::MetaStore;
use crate::error::{MetaStoreError, MetaStoreErrorExt, Result};
use mstore_vfs::FileSystem;
use tracing::debug;

impl<F: FileSystem> MetaStore<F> {
    /// Names of every namespace, in filesystem enumeration order.
    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.with_lock(self.list_namespaces_unlocked()).await
    }

    pub async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        self.with_lock(self.namespace_exists_unlocked(namespace)).await
    }

    /// # Errors
    /// [`MetaStoreError::NamespaceExists`] if the namespace folder is already present.
    pub async fn create_namespace(&self, namespace: &str) -> Result<()> {
        self.with_lock(self.create_namespace_unlocked(namespace)).await
    }

    /// Removes an empty namespace. Absent namespaces are ignored.
    ///
    /// # Errors
    /// [`MetaStoreError::DependencyExists`] with the ids of the remaining element types.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.with_lock(self.delete_namespace_unlocked(namespace)).await
    }

    async fn list_namespaces_unlocked(&self) -> Result<Vec<String>> {
        let entries = self.entries(self.paths.meta_folder()).await?;
        Ok(entries.into_iter().filter(|e| e.is_folder() && !e.hidden).map(|e| e.name).collect())
    }

    pub(super) async fn namespace_exists_unlocked(&self, namespace: &str) -> Result<bool> {
        let folder = self.paths.namespace_folder(namespace)?;
        self.exists(&folder).await
    }

    async fn create_namespace_unlocked(&self, namespace: &str) -> Result<()> {
        let folder = self.paths.namespace_folder(namespace)?;
        if self.exists(&folder).await? {
            return Err(MetaStoreError::NamespaceExists {
                namespace: namespace.to_owned(),
                context: None,
            });
        }
        self.fs
            .create_folder(&folder)
            .await
            .context(format!("Unable to create namespace '{namespace}'"))?;
        debug!(namespace, "Namespace created");
        Ok(())
    }

    async fn delete_namespace_unlocked(&self, namespace: &str) -> Result<()> {
        let folder = self.paths.namespace_folder(namespace)?;
        if !self.exists(&folder).await? {
            return Ok(());
        }

        let dependencies = self.list_element_type_ids_unlocked(namespace).await?;
        if !dependencies.is_empty() {
            return Err(MetaStoreError::dependencies(
                format!("namespace '{namespace}' still holds element types"),
                dependencies,
            ));
        }

        if !self.fs.delete(&folder).await.context(format!("Unable to delete namespace '{namespace}'"))? {
            return Err(MetaStoreError::storage_refused(format!(
                "namespace folder '{namespace}' could not be removed, check that it is empty"
            )));
        }
        debug!(namespace, "Namespace deleted");
        Ok(())
    }
}
