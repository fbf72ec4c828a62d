//! Sidebar API endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use udocs_site::Sidebar;

use crate::error::ServerError;
use crate::state::{AppState, blocking};

/// Handle GET /api/sidebar.
pub(crate) async fn get_sidebar(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Sidebar>, ServerError> {
    let sidebar = blocking(&state, |state| {
        Ok(Sidebar::load_or_default(state.storage.as_ref())?)
    })
    .await?;
    Ok(Json(sidebar))
}
