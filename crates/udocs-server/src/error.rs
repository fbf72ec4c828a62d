//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use udocs_build::{ArchiveError, BuildError};
use udocs_site::SidebarError;
use udocs_storage::StorageError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No record stored at the requested path.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Route cannot name a guide.
    #[error("Invalid route: {0:?}")]
    InvalidRoute(String),

    /// Uploaded archive could not be unpacked.
    #[error("Invalid archive: {0}")]
    Archive(#[from] ArchiveError),

    /// Uploaded guide failed validation or building.
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Sidebar could not be loaded.
    #[error("Sidebar error: {0}")]
    Sidebar(#[from] SidebarError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::PageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::InvalidRoute(_) | Self::Archive(_) | Self::Build(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Sidebar(_) | Self::Template(_) | Self::Io(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = match &self {
            Self::PageNotFound(path) => json!({"error": "Page not found", "path": path}),
            _ => json!({"error": self.to_string()}),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::PageNotFound("/a".to_owned()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Storage(StorageError::not_found("/a")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::InvalidRoute("a/b".to_owned()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Archive(ArchiveError::MissingDocs).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Io(std::io::Error::other("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
