//! Error types for the build pipeline.

use std::io;
use std::path::{Path, PathBuf};

use udocs_renderer::TransformError;
use udocs_site::{SidebarError, SummaryError};
use udocs_storage::StorageError;

use crate::content::ContentError;
use crate::watch::WatchError;

/// Error returned when a docs directory does not have the required layout.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Directory is not named `docs`.
    #[error("Directory '{}' does not have a base name of 'docs'", .0.display())]
    NotDocsDir(PathBuf),
    /// Directory cannot be listed.
    #[error("Cannot read directory '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A required file is missing from the directory root.
    #[error("Missing {0:?} file")]
    MissingFile(&'static str),
}

/// Error returned when building, indexing or removing a guide fails.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Docs directory layout is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Route cannot name a namespace.
    #[error("Invalid route: {0:?}")]
    InvalidRoute(String),
    /// Reading a source file failed.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Walking the docs directory failed.
    #[error("Failed to walk docs directory: {0}")]
    Walk(#[from] walkdir::Error),
    /// `SUMMARY.md` is malformed.
    #[error("Failed to parse summary: {0}")]
    Summary(#[from] SummaryError),
    /// Sidebar could not be loaded or saved.
    #[error("Failed to update sidebar: {0}")]
    Sidebar(#[from] SidebarError),
    /// A Markdown page could not be rendered.
    #[error("Failed to render '{}': {source}", .path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
    /// The page template failed.
    #[error("Failed to render page template: {0}")]
    Template(#[from] minijinja::Error),
    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An externally hosted page could not be loaded.
    #[error("Failed to load external page {path}: {source}")]
    Content {
        path: String,
        #[source]
        source: ContentError,
    },
    /// The file watcher failed.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl BuildError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
