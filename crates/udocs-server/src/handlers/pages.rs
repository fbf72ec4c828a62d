//! Page endpoints.
//!
//! Stored HTML pages are wrapped in the document template together with the
//! sidebar. Any other stored file is returned as is.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use udocs_renderer::paths;
use udocs_site::Sidebar;

use crate::error::ServerError;
use crate::state::{AppState, blocking};

/// Page stored by a guide published without a route.
const ROOT_INDEX_ID: &str = "/index.html";

/// Query parameters for page requests.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    /// `true` returns the stored fragment without the layout.
    ajax: Option<String>,
}

impl PageParams {
    fn is_ajax(&self) -> bool {
        self.ajax.as_deref() == Some("true")
    }
}

/// Whether `id` names a raw file rather than a page.
fn is_asset(id: &str) -> bool {
    let ext = paths::extension(id);
    !ext.is_empty() && ext != ".html" && ext != ".quip"
}

/// Fetch a record, mapping absence to a 404.
fn fetch_page(state: &AppState, id: &str) -> Result<Vec<u8>, ServerError> {
    state.storage.fetch(id).map_err(|e| {
        if e.is_not_found() {
            ServerError::PageNotFound(id.to_owned())
        } else {
            e.into()
        }
    })
}

fn render_document(
    state: &AppState,
    route: &str,
    sidebar: &Sidebar,
    data: &[u8],
) -> Result<Response, ServerError> {
    let content = String::from_utf8_lossy(data);
    Ok(Html(state.templates.document(route, sidebar, &content)?).into_response())
}

/// Handle GET /.
///
/// Redirects to the configured root route. Otherwise serves a guide published
/// without a route, falling back to the list of guides.
pub(crate) async fn get_home(State(state): State<Arc<AppState>>) -> Result<Response, ServerError> {
    let root = state.config.root_route.trim_matches('/');
    if !root.is_empty() {
        return Ok(Redirect::temporary(&format!("/{root}")).into_response());
    }

    blocking(&state, |state| {
        let sidebar = Sidebar::load_or_default(state.storage.as_ref())?;
        match state.storage.fetch(ROOT_INDEX_ID) {
            Ok(data) => render_document(state, "", &sidebar, &data),
            Err(e) if e.is_not_found() => Ok(Html(state.templates.home(&sidebar)?).into_response()),
            Err(e) => Err(e.into()),
        }
    })
    .await
}

/// Handle GET /{route}.
pub(crate) async fn get_guide(
    Path(route): Path<String>,
    Query(params): Query<PageParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServerError> {
    let id = format!("/{route}");
    serve_page(state, route, id, params.is_ajax()).await
}

/// Handle GET /{route}/{*path}.
pub(crate) async fn get_page(
    Path((route, path)): Path<(String, String)>,
    Query(params): Query<PageParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServerError> {
    let id = format!("/{route}/{path}");
    serve_page(state, route, id, params.is_ajax()).await
}

async fn serve_page(
    state: Arc<AppState>,
    route: String,
    id: String,
    ajax: bool,
) -> Result<Response, ServerError> {
    blocking(&state, move |state| {
        let data = fetch_page(state, &id)?;
        tracing::debug!(id = %id, bytes = data.len(), "Serving page");

        if is_asset(&id) {
            let mime = mime_guess::from_path(&id).first_or_octet_stream();
            return Ok(([(header::CONTENT_TYPE, mime.to_string())], data).into_response());
        }
        if ajax {
            return Ok(Html(data).into_response());
        }

        let sidebar = Sidebar::load_or_default(state.storage.as_ref())?;
        render_document(state, &route, &sidebar, &data)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_asset() {
        assert!(is_asset("/guide/images/logo.png"));
        assert!(is_asset("/guide/data.json"));
        assert!(!is_asset("/guide/page.html"));
        assert!(!is_asset("/guide/AbC.quip"));
        assert!(!is_asset("/guide"));
        assert!(!is_asset("/guide/section"));
    }

    #[test]
    fn test_page_params_ajax() {
        let ajax = PageParams {
            ajax: Some("true".to_owned()),
        };
        assert!(ajax.is_ajax());
        assert!(!PageParams::default().is_ajax());
        assert!(
            !PageParams {
                ajax: Some("1".to_owned())
            }
            .is_ajax()
        );
    }
}
