//! Record id normalization.
//!
//! Ids are slash paths rooted at `/`. Normalizing is purely lexical: empty and
//! `.` segments are dropped and `..` pops the previous segment without ever
//! climbing above the root.

use glob::{MatchOptions, Pattern};

use crate::storage::{StorageError, StorageErrorKind};

/// Filename served for an extensionless id.
pub const INDEX_FILE: &str = "index.html";

/// Normalize an id to its rooted, cleaned form.
///
/// `sidebar.json` becomes `/sidebar.json`, `a//b/./c.html` becomes `/a/b/c.html`.
#[must_use]
pub fn normalize(id: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in id.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Normalize an id for reading, resolving extensionless ids to their index page.
#[must_use]
pub fn resolve_fetch(id: &str) -> String {
    let id = normalize(id);
    if has_extension(&id) {
        id
    } else if id == "/" {
        format!("/{INDEX_FILE}")
    } else {
        format!("{id}/{INDEX_FILE}")
    }
}

/// Whether the last segment of an id has a file extension.
#[must_use]
pub fn has_extension(id: &str) -> bool {
    let name = id.rsplit('/').next().unwrap_or(id);
    name.rfind('.').is_some_and(|dot| dot > 0 && dot + 1 < name.len())
}

/// Whether the raw id tries to climb out of its namespace.
#[must_use]
pub fn is_traversal(id: &str) -> bool {
    id.split('/').any(|segment| segment == "..")
}

/// Whether an id names an HTML document.
#[must_use]
pub fn is_html(id: &str) -> bool {
    std::path::Path::new(id)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

/// Compile a glob over ids. The pattern is normalized like an id.
pub fn compile_glob(pattern: &str) -> Result<Pattern, StorageError> {
    Pattern::new(&normalize(pattern)).map_err(|e| {
        StorageError::new(StorageErrorKind::InvalidId)
            .with_id(pattern)
            .with_source(e)
    })
}

const ID_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Whether `id` matches `pattern` exactly.
#[must_use]
pub fn glob_matches(pattern: &Pattern, id: &str) -> bool {
    pattern.matches_with(id, ID_MATCH)
}

/// Whether `id` or any namespace above it matches `pattern`.
///
/// Deleting a matched namespace removes everything beneath it.
#[must_use]
pub fn glob_covers(pattern: &Pattern, id: &str) -> bool {
    let mut prefix = id;
    loop {
        if glob_matches(pattern, prefix) {
            return true;
        }
        match prefix.rfind('/') {
            Some(0) | None => return false,
            Some(slash) => prefix = &prefix[..slash],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_roots_bare_filename() {
        assert_eq!(normalize("sidebar.json"), "/sidebar.json");
    }

    #[test]
    fn test_normalize_collapses_separators_and_dots() {
        assert_eq!(normalize("a//b/./c.html"), "/a/b/c.html");
        assert_eq!(normalize("/a/b/../c.html"), "/a/c.html");
        assert_eq!(normalize("/../../x"), "/x");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_resolve_fetch_appends_index() {
        assert_eq!(resolve_fetch("/route"), "/route/index.html");
        assert_eq!(resolve_fetch("/route/"), "/route/index.html");
        assert_eq!(resolve_fetch("/"), "/index.html");
        assert_eq!(resolve_fetch("/route/page.html"), "/route/page.html");
        assert_eq!(resolve_fetch("/route/img.png"), "/route/img.png");
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("/a/b.html"));
        assert!(!has_extension("/a/b"));
        assert!(!has_extension("/a/.hidden"));
        assert!(!has_extension("/a.b/c"));
    }

    #[test]
    fn test_glob_matches_single_segment_wildcard() {
        let pattern = compile_glob("route/*.html").unwrap();
        assert!(glob_matches(&pattern, "/route/a.html"));
        assert!(!glob_matches(&pattern, "/route/sub/a.html"));
    }

    #[test]
    fn test_glob_covers_namespace() {
        let pattern = compile_glob("/route").unwrap();
        assert!(glob_covers(&pattern, "/route/index.html"));
        assert!(glob_covers(&pattern, "/route/a/b.png"));
        assert!(!glob_covers(&pattern, "/route-two/index.html"));
        assert!(!glob_covers(&pattern, "/sidebar.json"));
    }

    #[test]
    fn test_is_traversal() {
        assert!(is_traversal("/route/../../etc/passwd"));
        assert!(!is_traversal("/route/..page.html"));
    }
}
