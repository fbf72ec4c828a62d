//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use udocs_build::{ContentSource, QuipClient};
use udocs_storage::Storage;

use crate::{BuildLock, ServerConfig};
use crate::error::ServerError;
use crate::templates::Templates;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Storage backend holding every published guide.
    pub(crate) storage: Arc<dyn Storage>,
    /// Compiled page templates.
    pub(crate) templates: Templates,
    /// Sources for externally hosted pages of uploaded guides.
    pub(crate) sources: Vec<Box<dyn ContentSource>>,
    /// Server configuration.
    pub(crate) config: ServerConfig,
    /// Serializes builds and removals.
    pub(crate) build_lock: BuildLock,
}

impl AppState {
    pub(crate) fn new(config: ServerConfig, storage: Arc<dyn Storage>) -> Result<Self, ServerError> {
        let templates = Templates::new(&config.site)?;
        let build_lock = Arc::clone(&config.build_lock);
        let mut sources: Vec<Box<dyn ContentSource>> = Vec::new();
        if let Some(token) = &config.quip_access_token {
            sources.push(Box::new(QuipClient::new(token.clone())));
        }

        Ok(Self {
            storage,
            templates,
            sources,
            config,
            build_lock,
        })
    }
}

/// Run storage-bound work on the blocking thread pool.
pub(crate) async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ServerError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state)).await?
}
