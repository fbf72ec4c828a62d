//! Search endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use udocs_site::Sidebar;

use crate::error::ServerError;
use crate::state::{AppState, blocking};

/// Query parameters for GET /search.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Whether the client asked for JSON rather than a page.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Handle GET /search?q=.
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let json = wants_json(&headers);
    blocking(&state, move |state| {
        let result = state.storage.query(&params.q)?;
        tracing::debug!(phrase = %params.q, total = result.total, "Search");
        if json {
            return Ok(Json(result).into_response());
        }
        let sidebar = Sidebar::load_or_default(state.storage.as_ref())?;
        Ok(Html(state.templates.search(&sidebar, &result)?).into_response())
    })
    .await
}
