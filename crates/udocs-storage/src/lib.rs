//! Storage abstraction for udocs.
//!
//! This crate provides the [`Storage`] trait through which the build pipeline
//! persists rendered pages and the HTTP layer reads them back. Every backend
//! pairs a record store with a full-text [`SearchIndex`].
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait with fetch, glob, insert, delete, index, query and drop
//! - [`FsStorage`] storing records as files below a root directory
//! - [`MockStorage`] for testing (behind `mock` feature flag)
//! - [`SearchIndex`], the tantivy index shared by all backends
//!
//! Other backends (e.g. `udocs-storage-mongo`) implement the same trait.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use udocs_storage::{FsStorage, Storage};
//!
//! let storage = FsStorage::open("_docs", Path::new("_docs/.search"))?;
//! storage.insert("/guide/index.html", b"<h1>Guide</h1>")?;
//! let page = storage.fetch("/guide")?;
//! ```

mod fs;
pub mod id;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod search;
mod storage;

pub use fs::FsStorage;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockStorage;
pub use search::{QueryMatch, QueryResult, SearchError, SearchIndex, SearchRecord, strip_html_tags};
pub use storage::{Storage, StorageError, StorageErrorKind};

/// Reserved id of the serialized sidebar.
pub const SIDEBAR_ID: &str = "/sidebar.json";
