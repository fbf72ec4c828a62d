//! HTTP server for udocs.
//!
//! This crate serves published guides from a [`Storage`] backend:
//! - pages wrapped in the site layout, and raw assets
//! - full-text search over every guide
//! - the shared sidebar as JSON
//! - an API to publish a guide from a tarball and to remove it again
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use udocs_server::{ServerConfig, run_server};
//! use udocs_storage::FsStorage;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = FsStorage::open("deploy", "deploy/search".as_ref()).unwrap();
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     run_server(ServerConfig::default(), Arc::new(storage), shutdown)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! # Routes
//!
//! ```text
//! GET    /                     root route redirect, or the list of guides
//! GET    /search?q=            search page (JSON with Accept: application/json)
//! GET    /api/sidebar          sidebar JSON
//! POST   /api/{route}          publish a docs tarball
//! DELETE /api/{route}          remove a guide
//! GET    /{route}[/{*path}]    page or asset
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;
mod templates;

use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::Router;
use serde::Serialize;
use state::AppState;
use udocs_storage::Storage;

pub use error::ServerError;

/// Values shown by every page.
#[derive(Clone, Debug, Serialize)]
pub struct SiteParams {
    /// Public URL of the server without port.
    pub entry_point: String,
    /// Organization name shown in the page header.
    pub organization: String,
    /// Contact address shown in the footer.
    pub email: String,
    /// Placeholder of the search box.
    pub search_placeholder: String,
    /// Primary theme color.
    pub color: String,
}

impl Default for SiteParams {
    fn default() -> Self {
        Self {
            entry_point: "http://localhost".to_owned(),
            organization: String::new(),
            email: String::new(),
            search_placeholder: "Search".to_owned(),
            color: "#5ca616".to_owned(),
        }
    }
}

/// Lock serializing every build and removal against one storage.
///
/// Share it with anything else that builds into the server's storage, such
/// as a rebuild-on-change loop.
pub type BuildLock = Arc<Mutex<()>>;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Base of the links returned by the publish API, `{entry_point}:{port}`.
    pub public_url: String,
    /// Route `/` redirects to. Empty serves the home page.
    pub root_route: String,
    /// Values shown by every page.
    pub site: SiteParams,
    /// Quip token for guides linking Quip documents.
    pub quip_access_token: Option<String>,
    /// Held by the publish and destroy endpoints while they write.
    pub build_lock: BuildLock,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            port: 9554,
            public_url: "http://localhost:9554".to_owned(),
            root_route: String::new(),
            site: SiteParams::default(),
            quip_access_token: None,
            build_lock: BuildLock::default(),
        }
    }
}

/// Create server configuration from udocs config.
#[must_use]
pub fn server_config_from_config(config: &udocs_config::Config) -> ServerConfig {
    ServerConfig {
        bind_addr: config.server.bind_addr.clone(),
        port: config.server.port,
        public_url: config.server.public_url(),
        root_route: config.site.root_route.clone(),
        site: SiteParams {
            entry_point: config.server.entry_point.clone(),
            organization: config.site.organization.clone(),
            email: config.site.email.clone(),
            search_placeholder: config.site.search_placeholder.clone(),
            color: config.site.primary_color.clone(),
        },
        quip_access_token: config.quip_access_token().map(str::to_owned),
        build_lock: BuildLock::default(),
    }
}

/// Create the application router over `storage`.
///
/// # Errors
///
/// Returns an error if the embedded templates fail to compile.
pub fn create_router(
    config: ServerConfig,
    storage: Arc<dyn Storage>,
) -> Result<Router, ServerError> {
    let state = Arc::new(AppState::new(config, storage)?);
    Ok(app::create_router(state))
}

/// Run the server until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(
    config: ServerConfig,
    storage: Arc<dyn Storage>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let app = create_router(config, storage)?;

    let listener = tokio::net::TcpListener::bind((bind_addr.as_str(), port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received, stopping server...");
        })
        .await?;

    Ok(())
}
