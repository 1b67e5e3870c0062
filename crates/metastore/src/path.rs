//! Mapping from (namespace, element type, element id) to document locations.
//!
//! ```text
//! <meta>/<namespace>/<type>/.type.<ext>
//! <meta>/<namespace>/<type>/<element id>.<ext>
//! ```
//!
//! Every component is validated before a path is built, so no I/O ever sees a name that could
//! alias another location.

use crate::error::{MetaStoreError, Result};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".lock";

/// Pure path arithmetic for one store layout.
#[derive(Debug, Clone)]
pub struct PathConvention {
    meta: PathBuf,
    extension: String,
    type_file: String,
}

impl PathConvention {
    #[must_use]
    pub fn new(meta: impl Into<PathBuf>, extension: &str, type_file: impl Into<String>) -> Self {
        Self { meta: meta.into(), extension: extension.to_owned(), type_file: type_file.into() }
    }

    /// Folder holding every namespace, relative to the filesystem root.
    #[must_use]
    pub fn meta_folder(&self) -> &Path {
        &self.meta
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.meta.join(LOCK_FILE)
    }

    #[must_use]
    pub fn type_file_name(&self) -> &str {
        &self.type_file
    }

    /// Checks that `name` can be used as a single path component.
    ///
    /// # Errors
    /// [`MetaStoreError::InvalidName`] describing the first violated rule.
    pub fn validate_name(&self, what: &str, name: &str) -> Result<()> {
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name == "." || name == ".." {
            Some("must not be a relative path component")
        } else if name.starts_with('.') {
            Some("must not start with '.'")
        } else if name.trim() != name {
            Some("must not start or end with whitespace")
        } else if name.contains(['/', '\\', '\0']) {
            Some("must not contain path separators or NUL")
        } else if self.type_file.strip_suffix(&format!(".{}", self.extension)) == Some(name) {
            Some("is reserved")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(MetaStoreError::invalid_name(format!("{what} '{name}' {reason}"))),
            None => Ok(()),
        }
    }

    pub fn namespace_folder(&self, namespace: &str) -> Result<PathBuf> {
        self.validate_name("namespace", namespace)?;
        Ok(self.meta.join(namespace))
    }

    pub fn type_folder(&self, namespace: &str, element_type: &str) -> Result<PathBuf> {
        self.validate_name("element type", element_type)?;
        Ok(self.namespace_folder(namespace)?.join(element_type))
    }

    pub fn type_document(&self, namespace: &str, element_type: &str) -> Result<PathBuf> {
        Ok(self.type_folder(namespace, element_type)?.join(&self.type_file))
    }

    pub fn element_document(&self, namespace: &str, element_type: &str, id: &str) -> Result<PathBuf> {
        self.validate_name("element id", id)?;
        let file = format!("{id}.{}", self.extension);
        Ok(self.type_folder(namespace, element_type)?.join(file))
    }

    /// Element id encoded in a type-folder file name.
    ///
    /// Returns `None` for the type document, hidden files and files with another extension.
    #[must_use]
    pub fn element_id<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        if file_name == self.type_file || file_name.starts_with('.') {
            return None;
        }
        file_name
            .strip_suffix(self.extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn xml() -> PathConvention {
        PathConvention::new("metastore", "xml", ".type.xml")
    }

    #[test]
    fn layout_matches_convention() {
        let p = xml();
        assert_eq!(p.namespace_folder("etl").unwrap(), Path::new("metastore/etl"));
        assert_eq!(p.type_document("etl", "jobs").unwrap(), Path::new("metastore/etl/jobs/.type.xml"));
        assert_eq!(
            p.element_document("etl", "jobs", "nightly").unwrap(),
            Path::new("metastore/etl/jobs/nightly.xml")
        );
        assert_eq!(p.lock_file(), Path::new("metastore/.lock"));
    }

    #[test]
    fn bad_names_fail_before_io() {
        let p = xml();
        for bad in ["", ".", "..", ".hidden", "a/b", "a\\b", "nul\0", ".type", " ", " etl", "etl\t"] {
            assert!(
                matches!(p.namespace_folder(bad), Err(MetaStoreError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(p.element_document("etl", "jobs", "../x").is_err());
    }

    #[test]
    fn element_ids_from_file_names() {
        let p = xml();
        assert_eq!(p.element_id("nightly.xml"), Some("nightly"));
        assert_eq!(p.element_id("v1.2.xml"), Some("v1.2"));
        assert_eq!(p.element_id(".type.xml"), None);
        assert_eq!(p.element_id(".nightly.xml.vfstmp.1.1"), None);
        assert_eq!(p.element_id("notes.txt"), None);
        assert_eq!(p.element_id("xml"), None);
        assert_eq!(p.element_id(".xml"), None);
    }

    fn name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_]([A-Za-z0-9_. -]{0,10}[A-Za-z0-9_])?"
    }

    proptest! {
        #[test]
        fn element_documents_are_injective(
            a in (name(), name(), name()),
            b in (name(), name(), name()),
        ) {
            let p = xml();
            let pa = p.element_document(&a.0, &a.1, &a.2).unwrap();
            let pb = p.element_document(&b.0, &b.1, &b.2).unwrap();
            prop_assert_eq!(pa == pb, a == b);
            prop_assert_ne!(pa, p.type_document(&b.0, &b.1).unwrap());
        }

        #[test]
        fn element_id_inverts_element_document(ns in name(), ty in name(), id in name()) {
            let p = xml();
            let doc = p.element_document(&ns, &ty, &id).unwrap();
            let file = doc.file_name().and_then(|f| f.to_str()).unwrap();
            prop_assert_eq!(p.element_id(file), Some(id.as_str()));
        }
    }
}
