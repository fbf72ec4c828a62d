//! Guide build, re-indexing and removal.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use udocs_renderer::paths::{self, SUMMARY_MD};
use udocs_renderer::render_markdown;
use udocs_site::{Sidebar, Summary, parse_summary};
use udocs_storage::{SIDEBAR_ID, Storage};
use walkdir::WalkDir;

use crate::content::ContentSource;
use crate::error::BuildError;
use crate::template::PageTemplate;

/// Build the docs in `dir` into `storage` under `route`.
///
/// Files are visited in lexical order. The first `SUMMARY.md` found is parsed
/// and merged into the stored sidebar, Markdown pages are rendered and
/// wrapped, and every other file is copied verbatim. Pages served by one of
/// `sources` are then fetched and the summary's pages are re-indexed.
///
/// A failed build is not rolled back; records written before the failure stay.
pub fn build(
    route: &str,
    dir: &Path,
    storage: &dyn Storage,
    sources: &[Box<dyn ContentSource>],
) -> Result<Summary, BuildError> {
    let root = dir.canonicalize().map_err(|e| BuildError::io(dir, e))?;
    let template = PageTemplate::new()?;
    let mut summary = None;

    tracing::info!(route, dir = %root.display(), "Building guide");

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = relative_id(&root, path);
        let data = fs::read(path).map_err(|e| BuildError::io(path, e))?;

        if summary.is_none() && entry.file_name() == OsStr::new(SUMMARY_MD) {
            let parsed = parse_summary(route, &data)?;
            let mut sidebar = Sidebar::load_or_default(storage)?;
            sidebar.merge(parsed.clone());
            sidebar.save(storage)?;
            summary = Some(parsed);
        } else if paths::is_markdown(&rel) {
            let html = render_markdown(route, &data).map_err(|source| BuildError::Transform {
                path: path.to_path_buf(),
                source,
            })?;
            let page = template.render(&html)?;
            let id = paths::to_html_path(&["/", route, rel.as_str()]);
            storage.insert(&id, page.as_bytes())?;
            tracing::debug!(id = %id, "Stored page");
        } else {
            storage.insert(&paths::page_id(route, &rel), &data)?;
        }
    }

    let summary = summary.unwrap_or_else(|| Summary::empty(route));
    load_external_pages(&summary, storage, sources)?;
    update_search_index(&summary, storage)?;

    tracing::info!(route, pages = summary.iter().count(), "Built guide");
    Ok(summary)
}

/// Slash-separated path of `path` below `root`.
fn relative_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Fetch pages hosted by a content source and store them at their paths.
fn load_external_pages(
    summary: &Summary,
    storage: &dyn Storage,
    sources: &[Box<dyn ContentSource>],
) -> Result<(), BuildError> {
    for page in summary.iter() {
        let Some(source) = sources.iter().find(|s| s.handles(&page.path)) else {
            continue;
        };
        let data = source.fetch(&page.path).map_err(|source| BuildError::Content {
            path: page.path.clone(),
            source,
        })?;
        storage.insert(&page.path, &data)?;
        tracing::debug!(path = %page.path, "Stored external page");
    }
    Ok(())
}

/// Index every HTML page of `summary` for search.
///
/// Assets and pages that cannot be fetched are skipped (their sub-pages are
/// still indexed); an indexing failure aborts.
pub fn update_search_index(summary: &Summary, storage: &dyn Storage) -> Result<(), BuildError> {
    let mut indexed = 0_usize;
    for page in summary.iter() {
        if page.path.ends_with(SIDEBAR_ID) || !is_searchable(&page.path) {
            continue;
        }
        let data = match storage.fetch(&page.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(path = %page.path, error = %e, "Skipping unindexable page");
                continue;
            }
        };
        storage.index(&page.path, &page.title, &data)?;
        indexed += 1;
    }
    tracing::debug!(route = %summary.route, indexed, "Updated search index");
    Ok(())
}

/// Whether the page at `path` holds HTML: a rendered page or an external one.
fn is_searchable(path: &str) -> bool {
    matches!(paths::extension(path), ".html" | ".quip")
}

/// Whether `route` names a single namespace segment.
#[must_use]
pub fn is_valid_route(route: &str) -> bool {
    !route.is_empty()
        && route != "."
        && route != ".."
        && !route.contains(['/', '\\', '*', '?', '[', ']'])
}

/// Remove a published guide.
///
/// The route's sidebar entry is emptied (the route stays registered) and
/// everything under `/{route}` is deleted.
pub fn destroy_route(route: &str, storage: &dyn Storage) -> Result<(), BuildError> {
    if !is_valid_route(route) {
        return Err(BuildError::InvalidRoute(route.to_owned()));
    }

    let mut sidebar = Sidebar::load_or_default(storage)?;
    sidebar.clear_route(route);
    sidebar.save(storage)?;

    storage.delete_glob(&format!("/{route}/**"))?;
    storage.delete_glob(&format!("/{route}"))?;

    tracing::info!(route, "Destroyed guide");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use udocs_storage::MockStorage;

    use super::*;
    use crate::content::ContentError;

    fn fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/docs")
    }

    struct StaticSource(&'static str);

    impl ContentSource for StaticSource {
        fn handles(&self, path: &str) -> bool {
            path.ends_with(".quip")
        }

        fn fetch(&self, _path: &str) -> Result<Vec<u8>, ContentError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    struct FailingSource;

    impl ContentSource for FailingSource {
        fn handles(&self, _path: &str) -> bool {
            true
        }

        fn fetch(&self, path: &str) -> Result<Vec<u8>, ContentError> {
            Err(ContentError::InvalidPath(path.to_owned()))
        }
    }

    #[test]
    fn test_build_fixture() {
        let storage = MockStorage::new();

        let summary = build("fixture", &fixture(), &storage, &[]).unwrap();

        assert_eq!(summary.header, "Fixture Guide");
        assert_eq!(
            storage.ids(),
            vec![
                "/fixture/alpha/configuration.html",
                "/fixture/alpha/index.html",
                "/fixture/images/diagram.svg",
                "/fixture/index.html",
                "/sidebar.json",
            ]
        );

        let index = storage.text("/fixture/index.html").unwrap();
        assert!(index.starts_with("<div class=\"udocs-content\">"));
        assert!(index.contains(r#"<a href="/fixture/alpha/index.html">Alpha</a>"#));
        assert!(index.contains(r#"<img src="/fixture/images/diagram.svg" alt="Diagram">"#));

        let config = storage.text("/fixture/alpha/configuration.html").unwrap();
        assert!(config.contains(r#"<table class="table">"#));
        assert!(config.contains(r#"<code class="language-toml">"#));

        assert_eq!(
            storage.fetch("/fixture/images/diagram.svg").unwrap(),
            fs::read(fixture().join("images/diagram.svg")).unwrap()
        );

        let sidebar = Sidebar::load(&storage).unwrap();
        assert_eq!(sidebar.get("fixture"), Some(&summary));
    }

    #[test]
    fn test_build_indexes_summary_pages() {
        let storage = MockStorage::new();
        build("fixture", &fixture(), &storage, &[]).unwrap();

        let result = storage.query("listens").unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.query_matches[0].id, "/fixture/alpha/configuration.html");
        assert_eq!(result.query_matches[0].title, "Configuration");
    }

    #[test]
    fn test_build_merges_into_existing_sidebar() {
        let storage = MockStorage::new();
        let mut sidebar = Sidebar::default();
        sidebar.merge(Summary::empty("other"));
        sidebar.save(&storage).unwrap();

        build("fixture", &fixture(), &storage, &[]).unwrap();

        let sidebar = Sidebar::load(&storage).unwrap();
        assert_eq!(sidebar.routes().collect::<Vec<_>>(), ["other", "fixture"]);
    }

    #[test]
    fn test_build_without_summary_stores_files() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("page.md"), "# Page\n").unwrap();

        let storage = MockStorage::new();
        let summary = build("r", &docs, &storage, &[]).unwrap();

        assert_eq!(summary, Summary::empty("r"));
        assert_eq!(storage.ids(), vec!["/r/page.html"]);
    }

    #[test]
    fn test_build_rejects_invalid_summary() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("SUMMARY.md"), "* [No header](a.md)\n").unwrap();

        let err = build("r", &docs, &MockStorage::new(), &[]).unwrap_err();
        assert!(matches!(err, BuildError::Summary(_)));
    }

    #[test]
    fn test_build_loads_external_pages() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("SUMMARY.md"), "# Ext\n* [Design](AbC.quip)\n").unwrap();

        let storage = MockStorage::new();
        let sources: Vec<Box<dyn ContentSource>> = vec![Box::new(StaticSource("<p>design notes</p>"))];
        build("ext", &docs, &storage, &sources).unwrap();

        assert_eq!(storage.text("/ext/AbC.quip").unwrap(), "<p>design notes</p>");
        assert_eq!(storage.query("design").unwrap().total, 1);
    }

    #[test]
    fn test_build_fails_when_external_page_fails() {
        let storage = MockStorage::new();
        let sources: Vec<Box<dyn ContentSource>> = vec![Box::new(FailingSource)];

        let err = build("fixture", &fixture(), &storage, &sources).unwrap_err();
        assert!(matches!(err, BuildError::Content { .. }));
    }

    #[test]
    fn test_build_missing_dir() {
        let temp = TempDir::new().unwrap();
        let err = build("r", &temp.path().join("docs"), &MockStorage::new(), &[]).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }

    #[test]
    fn test_update_search_index_skips_missing_parent() {
        let storage = MockStorage::new().with_record("/r/child.html", "<p>child body</p>");
        let summary = parse_summary("r", b"# R\n* [Parent](parent.md)\n\t* [Child](child.md)\n").unwrap();

        update_search_index(&summary, &storage).unwrap();

        let result = storage.query("child").unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.query_matches[0].id, "/r/child.html");
    }

    #[test]
    fn test_update_search_index_skips_assets() {
        let storage = MockStorage::new()
            .with_record("/r/index.html", "<p>overview</p>")
            .with_record("/r/logo.png", "logo bytes");
        let summary =
            parse_summary("r", b"# R\n* [Overview](README.md)\n* [Logo](logo.png)\n").unwrap();

        update_search_index(&summary, &storage).unwrap();

        assert_eq!(storage.query("overview").unwrap().total, 1);
        assert_eq!(storage.query("logo").unwrap().total, 0);
    }

    #[test]
    fn test_destroy_route() {
        let storage = MockStorage::new();
        build("fixture", &fixture(), &storage, &[]).unwrap();

        destroy_route("fixture", &storage).unwrap();

        assert_eq!(storage.ids(), vec!["/sidebar.json"]);
        let sidebar = Sidebar::load(&storage).unwrap();
        assert_eq!(sidebar.get("fixture"), Some(&Summary::empty("fixture")));
        assert_eq!(storage.query("listens").unwrap().total, 0);
    }

    #[test]
    fn test_destroy_route_rejects_invalid_route() {
        let storage = MockStorage::new().with_record("/a/index.html", "x");

        for route in ["", "..", "*", "a/b"] {
            let err = destroy_route(route, &storage).unwrap_err();
            assert!(matches!(err, BuildError::InvalidRoute(_)));
        }
        assert_eq!(storage.ids(), vec!["/a/index.html"]);
    }
}
