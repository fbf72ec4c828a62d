//! Publish and destroy endpoints.
//!
//! `POST /api/{route}` takes a gzipped tarball of a `docs/` directory and
//! builds it under `route`. `DELETE /api/{route}` removes the guide again.

use std::sync::{Arc, PoisonError};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use udocs_build::{BuildError, build, destroy_route, is_valid_route, unpack, validate};

use crate::error::ServerError;
use crate::state::{AppState, blocking};

/// Response body of a successful publish.
#[derive(Debug, Serialize)]
pub(crate) struct PublishResponse {
    code: u16,
    message: &'static str,
    /// Public URL of the published guide.
    href: String,
}

/// Handle POST /api/{route}.
pub(crate) async fn publish(
    Path(route): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishResponse>), ServerError> {
    if !is_valid_route(&route) {
        return Err(ServerError::InvalidRoute(route));
    }
    let href = format!("{}/{route}", state.config.public_url);

    blocking(&state, move |state| {
        let upload = tempfile::Builder::new().prefix("udocs-upload-").tempdir()?;
        let docs = unpack(&body, upload.path())?;
        validate(&docs).map_err(BuildError::from)?;

        let _guard = state.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let summary = build(&route, &docs, state.storage.as_ref(), &state.sources)?;
        tracing::info!(route = %route, header = %summary.header, "Published guide");
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            code: StatusCode::CREATED.as_u16(),
            message: "Created",
            href,
        }),
    ))
}

/// Handle DELETE /api/{route}.
///
/// The guide's pages are removed; its sidebar entry is emptied but stays
/// registered.
pub(crate) async fn destroy(
    Path(route): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ServerError> {
    if !is_valid_route(&route) {
        return Err(ServerError::InvalidRoute(route));
    }

    blocking(&state, move |state| {
        let _guard = state.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        destroy_route(&route, state.storage.as_ref())?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::OK)
}
