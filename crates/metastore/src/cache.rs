//! Advisory in-memory index.
//!
//! Nothing here is authoritative: the filesystem is the source of truth, every entry may be
//! stale, and the whole index can be dropped at any time without affecting correctness.

use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

type TypeKey = (String, String);
type ElementKey = (String, String, String);

#[derive(Debug, Default)]
struct CacheState {
    /// (namespace, type id) -> type name
    types: FxHashMap<TypeKey, String>,
    /// (namespace, type, folded element name) -> element id
    element_ids: FxHashMap<ElementKey, String>,
    /// (namespace, type, element id) -> element name
    element_names: FxHashMap<ElementKey, String>,
    processed: FxHashMap<PathBuf, SystemTime>,
}

/// Entry counts, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub types: usize,
    pub elements: usize,
    pub processed: usize,
}

/// Name-to-id associations and processed-file timestamps of one store.
#[derive(Debug, Default)]
pub struct CacheIndex {
    state: Mutex<CacheState>,
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn key(a: &str, b: &str, c: &str) -> ElementKey {
    (a.to_owned(), b.to_owned(), c.to_owned())
}

impl CacheIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type_id(&self, namespace: &str, type_name: &str, id: &str) {
        self.state.lock().types.insert((namespace.to_owned(), id.to_owned()), type_name.to_owned());
    }

    pub fn unregister_type_id(&self, namespace: &str, id: &str) {
        self.state.lock().types.remove(&(namespace.to_owned(), id.to_owned()));
    }

    #[must_use]
    pub fn type_name(&self, namespace: &str, id: &str) -> Option<String> {
        self.state.lock().types.get(&(namespace.to_owned(), id.to_owned())).cloned()
    }

    /// Associates `name` with `id`, dropping any older name the id was known under.
    pub fn register_element_id(&self, namespace: &str, element_type: &str, name: &str, id: &str) {
        let mut state = self.state.lock();
        let by_id = key(namespace, element_type, id);
        if let Some(old) = state.element_names.insert(by_id, name.to_owned()) {
            let old_key = key(namespace, element_type, &fold(&old));
            if state.element_ids.get(&old_key).is_some_and(|cached| cached == id) {
                state.element_ids.remove(&old_key);
            }
        }
        state.element_ids.insert(key(namespace, element_type, &fold(name)), id.to_owned());
    }

    pub fn unregister_element_id(&self, namespace: &str, element_type: &str, id: &str) {
        let mut state = self.state.lock();
        if let Some(name) = state.element_names.remove(&key(namespace, element_type, id)) {
            let name_key = key(namespace, element_type, &fold(&name));
            if state.element_ids.get(&name_key).is_some_and(|cached| cached == id) {
                state.element_ids.remove(&name_key);
            }
        }
    }

    /// Cached id for a case-insensitive element name.
    #[must_use]
    pub fn lookup_element_id(&self, namespace: &str, element_type: &str, name: &str) -> Option<String> {
        self.state.lock().element_ids.get(&key(namespace, element_type, &fold(name))).cloned()
    }

    #[must_use]
    pub fn cached_element_name(&self, namespace: &str, element_type: &str, id: &str) -> Option<String> {
        self.state.lock().element_names.get(&key(namespace, element_type, id)).cloned()
    }

    pub fn mark_processed(&self, path: &Path, modified: SystemTime) {
        self.state.lock().processed.insert(path.to_path_buf(), modified);
    }

    pub fn unmark_processed(&self, path: &Path) {
        self.state.lock().processed.remove(path);
    }

    /// True iff `path` was marked with exactly `modified`.
    #[must_use]
    pub fn is_processed(&self, path: &Path, modified: SystemTime) -> bool {
        self.state.lock().processed.get(path) == Some(&modified)
    }

    pub fn clear(&self) {
        *self.state.lock() = CacheState::default();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            types: state.types.len(),
            elements: state.element_names.len(),
            processed: state.processed.len(),
        }
    }
}
