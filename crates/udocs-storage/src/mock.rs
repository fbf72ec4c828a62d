//! Mock storage implementation for testing.
//!
//! Provides [`MockStorage`], an in-memory record map paired with an in-memory
//! search index.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::id;
use crate::search::{QueryResult, SearchIndex, SearchRecord};
use crate::storage::{Storage, StorageError};

/// Backend identifier for error messages.
const BACKEND: &str = "Mock";

/// In-memory storage for testing.
///
/// # Example
///
/// ```ignore
/// use udocs_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new().with_record("/guide/index.html", "<h1>Guide</h1>");
/// assert_eq!(storage.fetch("/guide").unwrap(), b"<h1>Guide</h1>");
/// ```
pub struct MockStorage {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
    search: SearchIndex,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    /// Create a new empty mock storage.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory search index cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            search: SearchIndex::in_memory().unwrap(),
        }
    }

    /// Add a record.
    #[must_use]
    pub fn with_record(self, id: &str, data: impl Into<Vec<u8>>) -> Self {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id::normalize(id), data.into());
        self
    }

    /// All stored ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Stored content as a UTF-8 string, if present.
    #[must_use]
    pub fn text(&self, id: &str) -> Option<String> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id::normalize(id))
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

impl Storage for MockStorage {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let id = id::resolve_fetch(id);
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(id).with_backend(BACKEND))
    }

    fn fetch_glob(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let pattern = id::compile_glob(pattern).map_err(|e| e.with_backend(BACKEND))?;
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|id| id::glob_matches(&pattern, id))
            .cloned()
            .collect())
    }

    fn insert(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id::normalize(id), data.to_vec());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let id = id::normalize(id);
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or_else(|| StorageError::not_found(&id).with_backend(BACKEND))?;
        self.search
            .remove(&id)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }

    fn delete_glob(&self, pattern: &str) -> Result<(), StorageError> {
        let pattern = id::compile_glob(pattern).map_err(|e| e.with_backend(BACKEND))?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let matched: Vec<String> = records
            .keys()
            .filter(|id| id::glob_covers(&pattern, id))
            .cloned()
            .collect();
        for id in matched {
            records.remove(&id);
            if let Err(e) = self.search.remove(&id) {
                tracing::warn!(id = %id, error = %e, "Failed to remove search record");
            }
        }
        Ok(())
    }

    fn index(&self, id: &str, title: &str, data: &[u8]) -> Result<(), StorageError> {
        self.search
            .upsert(&SearchRecord::from_html(&id::normalize(id), title, data))
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }

    fn query(&self, text: &str) -> Result<QueryResult, StorageError> {
        self.search
            .query(text)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }

    fn drop_all(&self) -> Result<(), StorageError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.search
            .clear()
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }
}
