//! CLI command implementations.

mod local;
mod remote;
mod serve;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use udocs_build::{ContentSource, QuipClient};
use udocs_config::{Config, StorageBackend};
use udocs_renderer::paths::SUMMARY_MD;
use udocs_site::extract_route;
use udocs_storage::{FsStorage, Storage};
use udocs_storage_mongo::MongoStorage;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use local::{build, tar, validate};
pub(crate) use remote::{destroy, publish};
pub(crate) use serve::ServeArgs;

/// Docs directory argument shared by most commands.
#[derive(Args)]
pub(crate) struct DirArgs {
    /// Docs directory.
    #[arg(short, long, default_value = "docs")]
    pub dir: PathBuf,
}

/// Print the effective settings as `UDOCS_*=` lines.
pub(crate) fn env(config_path: Option<&Path>) -> Result<(), CliError> {
    let output = Output::new();
    let config = Config::load(config_path, None)?;
    for line in config.env_lines() {
        output.data(&line);
    }
    Ok(())
}

/// Route named by the header of `dir/SUMMARY.md`.
pub(crate) fn route_from_summary(dir: &Path) -> Result<String, CliError> {
    let path = dir.join(SUMMARY_MD);
    let data = fs::read(&path)?;
    let route = extract_route(&data);
    if route.is_empty() {
        return Err(CliError::Usage(format!(
            "Failed to parse H1 header in {}",
            path.display()
        )));
    }
    Ok(route)
}

/// Content sources enabled by the configuration.
pub(crate) fn content_sources(config: &Config) -> Vec<Box<dyn ContentSource>> {
    config
        .quip_access_token()
        .map(|token| Box::new(QuipClient::new(token)) as Box<dyn ContentSource>)
        .into_iter()
        .collect()
}

/// Open the configured storage backend.
pub(crate) fn open_storage(backend: &StorageBackend) -> Result<Arc<dyn Storage>, CliError> {
    let storage: Arc<dyn Storage> = match backend {
        StorageBackend::Filesystem {
            deploy_dir,
            search_dir,
        } => Arc::new(FsStorage::open(deploy_dir.clone(), search_dir)?),
        StorageBackend::Mongo { url, search_dir } => {
            Arc::new(MongoStorage::connect(url, search_dir)?)
        }
    };
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn docs_with_summary(summary: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join(SUMMARY_MD), summary).unwrap();
        (temp, docs)
    }

    #[test]
    fn test_route_from_summary() {
        let (_temp, docs) = docs_with_summary("# Getting Started\n* [Intro](intro.md)\n");

        assert_eq!(route_from_summary(&docs).unwrap(), "getting-started");
    }

    #[test]
    fn test_route_from_summary_without_header() {
        let (_temp, docs) = docs_with_summary("* [Intro](intro.md)\n");

        let err = route_from_summary(&docs).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_route_from_summary_missing_file() {
        let temp = TempDir::new().unwrap();

        let err = route_from_summary(temp.path()).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_open_filesystem_storage() {
        let temp = TempDir::new().unwrap();
        let backend = StorageBackend::Filesystem {
            deploy_dir: temp.path().join("deploy"),
            search_dir: temp.path().join("search"),
        };

        let storage = open_storage(&backend).unwrap();
        storage.insert("/guide/index.html", b"<p>hi</p>").unwrap();
        assert_eq!(storage.fetch("/guide/index.html").unwrap(), b"<p>hi</p>");
    }
}
