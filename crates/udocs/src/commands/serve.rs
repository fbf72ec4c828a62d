//! `udocs serve` command implementation.

use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::thread;

use clap::Args;
use tokio::sync::oneshot;
use udocs_build::watch::{supervise, watch_markdown};
use udocs_build::{BuildError, is_valid_route, update_search_index};
use udocs_config::{CliSettings, Config, StorageBackend};
use udocs_server::{ServerConfig, run_server, server_config_from_config};
use udocs_site::Sidebar;
use udocs_storage::Storage;

use super::local::check_dir;
use super::{DirArgs, content_sources, open_storage, route_from_summary};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Serve published guides only; skip building and watching the docs directory.
    #[arg(long)]
    pub headless: bool,

    /// Remove every published guide before serving.
    #[arg(long)]
    pub reset: bool,

    /// Route to serve the docs directory under (default: from the summary header).
    #[arg(short = 'p', long)]
    pub home_path: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config).
    #[arg(long)]
    pub bind_addr: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be prepared, the initial build
    /// fails, the server fails, or a rebuild fails while serving.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            bind_addr: self.bind_addr.clone(),
            port: self.port,
            root_route: None,
        };
        let config = Config::load(config_path, Some(&cli_settings))?;

        let backend = config.storage_resolved.backend();
        let storage = open_storage(&backend)?;
        prepare_storage(
            storage.as_ref(),
            self.reset,
            matches!(backend, StorageBackend::Mongo { .. }),
        )?;

        let server_config = server_config_from_config(&config);
        let runtime = tokio::runtime::Runtime::new()?;

        if self.headless {
            for line in config.env_lines() {
                output.info(&line);
            }
            return runtime.block_on(serve(server_config, storage, None));
        }

        check_dir(&self.dirs.dir)?;
        let route = match &self.home_path {
            Some(path) => path.trim_matches('/').to_owned(),
            None => route_from_summary(&self.dirs.dir)?,
        };
        if !is_valid_route(&route) {
            return Err(CliError::Usage(format!("Invalid home path: {route:?}")));
        }

        let sources = content_sources(&config);
        udocs_build::build(&route, &self.dirs.dir, storage.as_ref(), &sources)?;
        let (events, watcher) = watch_markdown(&self.dirs.dir).map_err(BuildError::from)?;

        let (failed_tx, failed_rx) = oneshot::channel();
        let supervisor = {
            let storage = Arc::clone(&storage);
            let build_lock = Arc::clone(&server_config.build_lock);
            let dir = self.dirs.dir.clone();
            let route = route.clone();
            thread::spawn(move || {
                let result = supervise(&events, |_| {
                    let _guard = build_lock.lock().unwrap_or_else(PoisonError::into_inner);
                    udocs_build::build(&route, &dir, storage.as_ref(), &sources).map(drop)
                });
                if result.is_err() {
                    let _ = failed_tx.send(());
                }
                result
            })
        };

        output.highlight(&format!(
            "Serving docs at http://localhost:{}/{route}",
            config.server.port
        ));
        output.info("Press Ctrl-C to close when finished.");

        let served = runtime.block_on(serve(server_config, storage, Some(failed_rx)));

        watcher.stop();
        supervisor
            .join()
            .map_err(|_| CliError::Server("Watch supervisor panicked".to_owned()))??;
        served
    }
}

/// Reset storage if asked, re-save the sidebar and re-index Mongo guides.
///
/// An unreadable sidebar is replaced with an empty one.
fn prepare_storage(storage: &dyn Storage, reset: bool, reindex: bool) -> Result<(), CliError> {
    if reset {
        tracing::warn!("Removing all published guides");
        storage.drop_all()?;
    }

    let sidebar = Sidebar::load_or_default(storage).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable sidebar");
        Sidebar::default()
    });
    sidebar.save(storage)?;

    if reindex {
        for summary in sidebar.summaries() {
            update_search_index(summary, storage)?;
        }
    }
    Ok(())
}

/// Run the server until Ctrl-C, or until `failed` fires.
async fn serve(
    config: ServerConfig,
    storage: Arc<dyn Storage>,
    failed: Option<oneshot::Receiver<()>>,
) -> Result<(), CliError> {
    run_server(config, storage, shutdown_signal(failed))
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

async fn shutdown_signal(failed: Option<oneshot::Receiver<()>>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match failed {
        Some(failed) => {
            tokio::select! {
                () = ctrl_c => {}
                _ = failed => {}
            }
        }
        None => ctrl_c.await,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use udocs_site::Summary;
    use udocs_storage::{MockStorage, SIDEBAR_ID};

    use super::*;

    #[test]
    fn test_prepare_storage_writes_empty_sidebar() {
        let storage = MockStorage::new();

        prepare_storage(&storage, false, false).unwrap();

        assert!(Sidebar::load(&storage).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_storage_replaces_corrupt_sidebar() {
        let storage = MockStorage::new().with_record(SIDEBAR_ID, "not json");

        prepare_storage(&storage, false, false).unwrap();

        assert!(Sidebar::load(&storage).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_storage_reset() {
        let storage = MockStorage::new().with_record("/guide/index.html", "<p>x</p>");
        let mut sidebar = Sidebar::default();
        sidebar.merge(Summary::empty("guide"));
        sidebar.save(&storage).unwrap();

        prepare_storage(&storage, true, false).unwrap();

        assert_eq!(storage.ids(), vec![SIDEBAR_ID]);
        assert!(Sidebar::load(&storage).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_storage_reindexes() {
        let storage = MockStorage::new().with_record("/guide/index.html", "<p>searchable text</p>");
        let mut sidebar = Sidebar::default();
        sidebar.merge(udocs_site::parse_summary("guide", b"# Guide\n* [Intro](README.md)\n").unwrap());
        sidebar.save(&storage).unwrap();

        prepare_storage(&storage, false, true).unwrap();

        assert_eq!(storage.query("searchable").unwrap().total, 1);
    }
}
