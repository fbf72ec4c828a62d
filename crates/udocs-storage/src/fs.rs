//! Filesystem storage implementation.
//!
//! Provides [`FsStorage`], which maps every record id to a file below a root
//! directory and keeps its search index in a separate directory.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glob::Pattern;

use crate::id;
use crate::search::{QueryResult, SearchIndex, SearchRecord};
use crate::storage::{Storage, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Filesystem storage implementation.
///
/// All operations on one instance are serialized by a reader/writer lock:
/// reads share it, writes are exclusive. The lock is taken per call, so a
/// build in progress interleaves with concurrent reads between its writes.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use udocs_storage::{FsStorage, Storage};
///
/// let storage = FsStorage::open("_docs", Path::new("_docs/.search"))?;
/// storage.insert("/guide/index.html", b"<h1>Guide</h1>")?;
/// ```
pub struct FsStorage {
    /// Root directory holding the records.
    root: PathBuf,
    /// Search index directory (excluded from globbing when below `root`).
    search_dir: PathBuf,
    search: SearchIndex,
    lock: RwLock<()>,
}

impl FsStorage {
    /// Open storage rooted at `root`, creating the directories as needed.
    pub fn open(root: impl Into<PathBuf>, search_dir: &Path) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(e, None).with_backend(BACKEND))?;
        let search = SearchIndex::open(search_dir)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))?;

        tracing::info!(root = %root.display(), search = %search_dir.display(), "Opened filesystem storage");
        Ok(Self {
            root,
            search_dir: search_dir.to_path_buf(),
            search,
            lock: RwLock::new(()),
        })
    }

    /// Root directory of the records.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Map an id to its file path.
    ///
    /// Rejects ids with `..` segments to prevent escaping the root.
    fn resolve(&self, raw: &str, normalized: &str) -> Result<PathBuf, StorageError> {
        if id::is_traversal(raw) {
            return Err(StorageError::new(StorageErrorKind::InvalidId)
                .with_id(raw)
                .with_backend(BACKEND));
        }
        Ok(self.root.join(normalized.trim_start_matches('/')))
    }

    /// Map a file path below the root back to its id.
    fn id_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(format!("/{}", segments.join("/")))
    }

    fn is_reserved(&self, path: &Path) -> bool {
        path.starts_with(&self.search_dir)
    }

    /// Expand a glob pattern against the files below the root.
    fn glob_paths(&self, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
        let normalized = id::normalize(pattern);
        if id::is_traversal(pattern) {
            return Err(StorageError::new(StorageErrorKind::InvalidId)
                .with_id(pattern)
                .with_backend(BACKEND));
        }
        let full = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            normalized.trim_start_matches('/')
        );
        let paths = glob::glob(&full).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidId)
                .with_id(pattern)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        Ok(paths
            .filter_map(Result::ok)
            .filter(|p| p != &self.root && !self.is_reserved(p))
            .collect())
    }

    /// Collect every file id at or below `path`.
    fn collect_ids(&self, path: &Path, ids: &mut Vec<String>) {
        if path.is_dir() {
            let Ok(entries) = fs::read_dir(path) else {
                return;
            };
            for entry in entries.filter_map(Result::ok) {
                self.collect_ids(&entry.path(), ids);
            }
        } else if let Some(id) = self.id_for(path) {
            ids.push(id);
        }
    }

    fn remove_from_index(&self, id: &str) {
        if let Err(e) = self.search.remove(id) {
            tracing::warn!(id, error = %e, "Failed to remove search record");
        }
    }
}

impl Storage for FsStorage {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let normalized = id::resolve_fetch(id);
        let path = self.resolve(id, &normalized)?;
        let _guard = self.read_lock();
        fs::read(&path).map_err(|e| StorageError::io(e, Some(&normalized)).with_backend(BACKEND))
    }

    fn fetch_glob(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let _guard = self.read_lock();
        let mut ids: Vec<String> = self
            .glob_paths(pattern)?
            .iter()
            .filter(|p| p.is_file())
            .filter_map(|p| self.id_for(p))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn insert(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let normalized = id::normalize(id);
        let path = self.resolve(id, &normalized)?;
        let _guard = self.write_lock();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(e, Some(&normalized)).with_backend(BACKEND))?;
        }
        fs::write(&path, data)
            .map_err(|e| StorageError::io(e, Some(&normalized)).with_backend(BACKEND))?;
        tracing::debug!(id = %normalized, bytes = data.len(), "Inserted record");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let normalized = id::normalize(id);
        let path = self.resolve(id, &normalized)?;
        let _guard = self.write_lock();
        fs::remove_file(&path)
            .map_err(|e| StorageError::io(e, Some(&normalized)).with_backend(BACKEND))?;
        self.search
            .remove(&normalized)
            .map_err(|e| StorageError::from(e).with_id(&normalized).with_backend(BACKEND))
    }

    fn delete_glob(&self, pattern: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock();
        for path in self.glob_paths(pattern)? {
            // Already removed together with a matched parent directory.
            if !path.exists() {
                continue;
            }

            let mut ids = Vec::new();
            self.collect_ids(&path, &mut ids);

            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete record");
                continue;
            }

            for id in &ids {
                self.remove_from_index(id);
            }
            tracing::debug!(path = %path.display(), records = ids.len(), "Deleted records");
        }
        Ok(())
    }

    fn index(&self, id: &str, title: &str, data: &[u8]) -> Result<(), StorageError> {
        let normalized = id::normalize(id);
        let _guard = self.write_lock();
        self.search
            .upsert(&SearchRecord::from_html(&normalized, title, data))
            .map_err(|e| StorageError::from(e).with_id(&normalized).with_backend(BACKEND))
    }

    fn query(&self, text: &str) -> Result<QueryResult, StorageError> {
        let _guard = self.read_lock();
        self.search
            .query(text)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }

    fn drop_all(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock();
        let entries =
            fs::read_dir(&self.root).map_err(|e| StorageError::io(e, None).with_backend(BACKEND))?;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if self.is_reserved(&path) || self.search_dir.starts_with(&path) {
                continue;
            }
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| StorageError::io(e, None).with_backend(BACKEND))?;
        }
        self.search
            .clear()
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))?;
        tracing::info!(root = %self.root.display(), "Dropped all records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fs_storage_is_send_sync() {
        assert_send_sync::<FsStorage>();
    }

    fn create_storage() -> (tempfile::TempDir, FsStorage) {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("deploy");
        let storage = FsStorage::open(&root, &temp_dir.path().join("search")).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_insert_then_fetch() {
        let (_temp, storage) = create_storage();
        storage.insert("/route/page.html", b"<p>hi</p>").unwrap();

        assert_eq!(storage.fetch("/route/page.html").unwrap(), b"<p>hi</p>");
        assert!(storage.root().join("route/page.html").is_file());
    }

    #[test]
    fn test_fetch_extensionless_id_reads_index() {
        let (_temp, storage) = create_storage();
        storage.insert("/route/index.html", b"home").unwrap();

        assert_eq!(storage.fetch("/route").unwrap(), b"home");
    }

    #[test]
    fn test_bare_and_rooted_ids_are_the_same_record() {
        let (_temp, storage) = create_storage();
        storage.insert("sidebar.json", b"[]").unwrap();

        assert_eq!(storage.fetch("/sidebar.json").unwrap(), b"[]");
    }

    #[test]
    fn test_fetch_missing_is_not_found() {
        let (_temp, storage) = create_storage();
        let err = storage.fetch("/nope.html").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.backend, Some("Fs"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let (_temp, storage) = create_storage();
        let err = storage.insert("/route/../../escape.html", b"x").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidId);
    }

    #[test]
    fn test_delete_then_fetch_is_not_found() {
        let (_temp, storage) = create_storage();
        storage.insert("/route/page.html", b"data").unwrap();

        storage.delete("/route/page.html").unwrap();

        assert!(storage.fetch("/route/page.html").unwrap_err().is_not_found());
        assert!(storage.delete("/route/page.html").unwrap_err().is_not_found());
    }

    #[test]
    fn test_fetch_glob_returns_files_only() {
        let (_temp, storage) = create_storage();
        storage.insert("/route/index.html", b"a").unwrap();
        storage.insert("/route/sub/page.html", b"b").unwrap();
        storage.insert("/route/img.png", b"c").unwrap();

        let ids = storage.fetch_glob("/route/*").unwrap();

        assert_eq!(ids, vec!["/route/img.png", "/route/index.html"]);
    }

    #[test]
    fn test_delete_glob_removes_namespace_and_index() {
        let (_temp, storage) = create_storage();
        storage.insert("/route/index.html", b"<p>alpha</p>").unwrap();
        storage.insert("/route/sub/page.html", b"<p>alpha</p>").unwrap();
        storage.insert("/other/index.html", b"<p>alpha</p>").unwrap();
        storage.index("/route/index.html", "Route", b"<p>alpha</p>").unwrap();
        storage.index("/other/index.html", "Other", b"<p>alpha</p>").unwrap();

        storage.delete_glob("/route").unwrap();

        assert!(storage.fetch("/route/index.html").unwrap_err().is_not_found());
        assert!(storage.fetch("/route/sub/page.html").unwrap_err().is_not_found());
        assert_eq!(storage.fetch("/other/index.html").unwrap(), b"<p>alpha</p>");
        let result = storage.query("alpha").unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.query_matches[0].id, "/other/index.html");
    }

    #[test]
    fn test_delete_glob_without_matches_is_ok() {
        let (_temp, storage) = create_storage();
        storage.delete_glob("/missing/**").unwrap();
    }

    #[test]
    fn test_index_and_query() {
        let (_temp, storage) = create_storage();
        storage
            .index("route/page.html", "Setup", b"<h1>Setup</h1><p>Configure the server</p>")
            .unwrap();

        let result = storage.query("configure").unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.query_matches[0].id, "/route/page.html");
        assert_eq!(result.query_matches[0].title, "Setup");
    }

    #[test]
    fn test_drop_all_keeps_search_dir_inside_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("deploy");
        let storage = FsStorage::open(&root, &root.join("search")).unwrap();
        storage.insert("/route/index.html", b"<p>delta</p>").unwrap();
        storage.index("/route/index.html", "Route", b"<p>delta</p>").unwrap();

        assert_eq!(storage.fetch_glob("/**/*").unwrap(), vec!["/route/index.html"]);

        storage.drop_all().unwrap();

        assert!(storage.fetch("/route/index.html").unwrap_err().is_not_found());
        assert_eq!(storage.query("delta").unwrap().total, 0);
        assert!(root.join("search").is_dir());
    }
}
