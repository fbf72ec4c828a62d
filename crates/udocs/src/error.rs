//! CLI error types.

use udocs_build::{ArchiveError, BuildError, ValidationError};
use udocs_config::ConfigError;
use udocs_site::SidebarError;
use udocs_storage::StorageError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Archive(#[from] ArchiveError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Sidebar(#[from] SidebarError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("{url} returned HTTP {status}: {body}")]
    Remote { url: String, status: u16, body: String },

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Server(String),
}
