//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait shared by every backend, along with
//! [`StorageError`] for unified error handling.
//!
//! # Id Convention
//!
//! All id parameters are slash-delimited paths rooted at the backend's
//! namespace, e.g. `/my-route/guide/page.html` or `/sidebar.json`. Callers may
//! pass unrooted or uncleaned ids; every backend normalizes them with
//! [`crate::id::normalize`] before use.

use crate::search::QueryResult;

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Record does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Invalid or unsafe id.
    InvalidId,
    /// Backend is unreachable.
    Unavailable,
    /// Search index failure.
    Index,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Record id context (if applicable).
    pub id: Option<String>,
    /// Backend identifier (e.g., "Fs", "Mongo", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            id: None,
            backend: None,
            source: None,
        }
    }

    /// Attach record id context.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error for an id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_id(id)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, id: Option<&str>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            _ => StorageErrorKind::Other,
        };
        let error = Self::new(kind).with_source(err);
        match id {
            Some(id) => error.with_id(id),
            None => error,
        }
    }

    /// Whether this error means the record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }
}

impl StorageErrorKind {
    fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::PermissionDenied => "Permission denied",
            Self::InvalidId => "Invalid id",
            Self::Unavailable => "Unavailable",
            Self::Index => "Search index error",
            Self::Other => "Error",
        }
    }
}

/// Renders as `[Backend] Kind: source (id: /route/page.html)`.
impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }
        f.write_str(self.kind.label())?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(id) = &self.id {
            write!(f, " (id: {id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Uniform record store shared by the build pipeline and the HTTP layer.
///
/// Every backend pairs a record store with a full-text [`SearchIndex`](crate::SearchIndex).
/// Implementations must be safe to share between a running build and
/// concurrent page reads; each call is individually atomic, but no guarantee
/// spans multiple calls.
pub trait Storage: Send + Sync {
    /// Read the record at `id`.
    ///
    /// An id without a file extension resolves to its `index.html`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageErrorKind::NotFound`] error if the record is absent.
    fn fetch(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// List the ids of all records matching a glob pattern.
    ///
    /// Only records are returned, never intermediate namespaces. The result
    /// is sorted.
    fn fetch_glob(&self, pattern: &str) -> Result<Vec<String>, StorageError>;

    /// Create or overwrite the record at `id`.
    fn insert(&self, id: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Remove the record at `id` together with its search record.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageErrorKind::NotFound`] error if the record is absent.
    fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Remove every record matching a glob pattern.
    ///
    /// Individual failures are logged and skipped.
    fn delete_glob(&self, pattern: &str) -> Result<(), StorageError>;

    /// Upsert the search record for an HTML document.
    fn index(&self, id: &str, title: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Run a full-text query.
    fn query(&self, text: &str) -> Result<QueryResult, StorageError>;

    /// Destroy all records and the search index.
    fn drop_all(&self) -> Result<(), StorageError>;
}
