//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Largest accepted guide upload.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/sidebar", get(handlers::sidebar::get_sidebar))
        .route(
            "/api/{route}",
            post(handlers::api::publish)
                .delete(handlers::api::destroy)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        );

    let page_routes = Router::new()
        .route("/", get(handlers::pages::get_home))
        .route("/search", get(handlers::search::search))
        .route("/{route}", get(handlers::pages::get_guide))
        .route("/{route}/{*path}", get(handlers::pages::get_page));

    let router = Router::new()
        .merge(api_routes)
        .merge(page_routes)
        .layer(TraceLayer::new_for_http());

    security::layers()
        .fold(router, |router, layer| router.layer(layer))
        .with_state(state)
}
