//! Path conversion between source Markdown files and published HTML pages.
//!
//! Paths are joined and cleaned lexically with slash separators: empty
//! segments are skipped, `.` is dropped and `..` pops the previous segment.
//! A rooted path never climbs above `/`.

/// Guide entry page in a source tree.
pub const README_MD: &str = "README.md";

/// Table of contents in a source tree.
pub const SUMMARY_MD: &str = "SUMMARY.md";

/// Published name of a directory's entry page.
pub const INDEX_HTML: &str = "index.html";

const MD_EXT: &str = ".md";
const HTML_EXT: &str = ".html";

/// Convert source segments to the published HTML path.
///
/// The last segment decides the conversion: a `README.md` base name
/// (any case) becomes `index.html`, a `.md` extension becomes `.html`, and
/// anything else is kept. An empty slice yields an empty string.
///
/// # Examples
///
/// ```
/// use udocs_renderer::paths::to_html_path;
///
/// assert_eq!(to_html_path(&["/", "guide", "README.md"]), "/guide/index.html");
/// assert_eq!(to_html_path(&["guide", "setup.md"]), "guide/setup.html");
/// ```
#[must_use]
pub fn to_html_path(segments: &[&str]) -> String {
    convert(README_MD, INDEX_HTML, MD_EXT, HTML_EXT, segments)
}

/// Convert published segments back to the source Markdown path.
#[must_use]
pub fn to_markdown_path(segments: &[&str]) -> String {
    convert(INDEX_HTML, README_MD, HTML_EXT, MD_EXT, segments)
}

/// Storage id of `path` inside the namespace of `route`.
#[must_use]
pub fn page_id(route: &str, path: &str) -> String {
    join(&["/", route, path])
}

/// Whether `url` points off-site.
#[must_use]
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Whether `path` names a Markdown source.
#[must_use]
pub fn is_markdown(path: &str) -> bool {
    extension(path) == MD_EXT
}

/// Extension of the last segment including the dot, or `""`.
#[must_use]
pub fn extension(path: &str) -> &str {
    let name = base_segment(path);
    name.rfind('.').map_or("", |dot| &name[dot..])
}

/// Join segments with `/` and clean the result.
///
/// Empty segments are ignored; if every segment is empty the result is `""`.
#[must_use]
pub fn join(segments: &[&str]) -> String {
    let parts: Vec<&str> = segments.iter().copied().filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return String::new();
    }
    clean(&parts.join("/"))
}

/// Lexically clean a slash path.
///
/// Returns `.` for an empty relative result and `/` for an empty rooted one.
#[must_use]
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|last| *last != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }

    let joined = out.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}

fn base_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn convert(old_root: &str, new_root: &str, old_ext: &str, new_ext: &str, segments: &[&str]) -> String {
    let Some((last, head)) = segments.split_last() else {
        return String::new();
    };

    let base = base_segment(last);
    let converted = if base.eq_ignore_ascii_case(old_root) {
        format!("{}{new_root}", &last[..last.len() - base.len()])
    } else if let Some(stem) = last.strip_suffix(old_ext).filter(|_| extension(last) == old_ext) {
        format!("{stem}{new_ext}")
    } else {
        (*last).to_owned()
    };

    let mut parts: Vec<&str> = head.to_vec();
    parts.push(&converted);
    join(&parts)
}
