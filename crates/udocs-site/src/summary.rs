//! `SUMMARY.md` parsing.
//!
//! A summary is a level-one header followed by a bulleted list of links:
//!
//! ```text
//! # My Guide
//!
//! * [Overview](README.md)
//! * [Alpha](alpha/README.md)
//! 	* [Sub-Alpha](alpha/sub-alpha.md)
//! 		* [Sub-Sub-Alpha](alpha/sub-sub-alpha.md)
//! ```
//!
//! The nesting level of an item is `(offset of "* [" in the line) % 3 + 1`, so
//! one tab or four spaces of indentation is level 2 and two tabs is level 3.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use udocs_renderer::paths;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"# (.*)$").expect("valid header regex"));

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\* \[(.*)\]\((.*)\)$").expect("valid item regex"));

static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Deepest supported page level.
const MAX_TREE_LEVEL: u8 = 3;

/// Error returned when a summary cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// No `# Header` line before the page list.
    #[error("Summary has no header line (e.g. '# My Guide')")]
    MissingHeader,
    /// An indented item has no parent item above it.
    #[error("Summary item has no parent page: {0}")]
    OrphanSubPage(String),
    /// An item is nested deeper than three levels.
    #[error("Summary item is nested too deep (only 3 levels are supported): {0}")]
    UnsupportedDepth(String),
    /// Summary is not UTF-8.
    #[error("Summary is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// A page in a guide's table of contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Link text.
    pub title: String,
    /// Published path (e.g. `/guide/alpha/index.html`).
    pub path: String,
    /// Nesting level, 1 to 3.
    pub tree_level: u8,
    /// Nested pages, one level deeper.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sub_pages: Vec<Page>,
}

/// A parsed `SUMMARY.md`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Namespace the guide is published under.
    pub route: String,
    /// Guide title from the header line.
    pub header: String,
    /// Top-level pages.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pages: Vec<Page>,
}

impl Summary {
    /// An entry with no header and no pages.
    #[must_use]
    pub fn empty(route: &str) -> Self {
        Self {
            route: route.to_owned(),
            ..Self::default()
        }
    }

    /// Every page depth-first, parents before children.
    #[must_use]
    pub fn iter(&self) -> Pages<'_> {
        Pages {
            stack: vec![self.pages.iter()],
        }
    }
}

/// Depth-first iterator over a summary's pages.
pub struct Pages<'a> {
    stack: Vec<std::slice::Iter<'a, Page>>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = &'a Page;

    fn next(&mut self) -> Option<&'a Page> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(page) => {
                    self.stack.push(page.sub_pages.iter());
                    return Some(page);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Older sidebars store absent page lists as `null`.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Page>, D::Error> {
    Ok(Option::<Vec<Page>>::deserialize(deserializer)?.unwrap_or_default())
}

/// First header line of a summary, trimmed.
///
/// Returns `None` if no line matches or the header is blank.
#[must_use]
pub fn parse_header(text: &str) -> Option<String> {
    header_line(text).map(|(_, header)| header)
}

fn header_line(text: &str) -> Option<(usize, String)> {
    text.lines().enumerate().find_map(|(index, line)| {
        HEADER_RE
            .captures(line)
            .map(|caps| (index, caps[1].trim().to_owned()))
    })
    .filter(|(_, header)| !header.is_empty())
}

/// Parse a summary published under `route`.
///
/// Item lines before the header are ignored, as are lines that are not items.
pub fn parse_summary(route: &str, data: &[u8]) -> Result<Summary, SummaryError> {
    let text = std::str::from_utf8(data)?;
    let (header_index, header) = header_line(text).ok_or(SummaryError::MissingHeader)?;

    let mut summary = Summary {
        route: route.to_owned(),
        header,
        pages: Vec::new(),
    };

    for line in text.lines().skip(header_index + 1) {
        let Some(caps) = ITEM_RE.captures(line) else {
            continue;
        };
        let Some(item) = caps.get(0) else {
            continue;
        };

        let level = tree_level(item.start());
        let id = paths::page_id(route, &caps[2]);
        let page = Page {
            title: caps[1].to_owned(),
            path: paths::to_html_path(&[id.as_str()]),
            tree_level: level,
            sub_pages: Vec::new(),
        };

        let orphan = || SummaryError::OrphanSubPage(line.to_owned());
        match level {
            1 => summary.pages.push(page),
            2 => summary
                .pages
                .last_mut()
                .ok_or_else(orphan)?
                .sub_pages
                .push(page),
            3 => summary
                .pages
                .last_mut()
                .and_then(|parent| parent.sub_pages.last_mut())
                .ok_or_else(orphan)?
                .sub_pages
                .push(page),
            _ => return Err(SummaryError::UnsupportedDepth(line.to_owned())),
        }
    }

    tracing::debug!(route, header = %summary.header, pages = summary.pages.len(), "Parsed summary");
    Ok(summary)
}

#[allow(clippy::cast_possible_truncation)]
fn tree_level(offset: usize) -> u8 {
    (offset % usize::from(MAX_TREE_LEVEL)) as u8 + 1
}

/// Route slug derived from a summary's header.
///
/// The header is lowercased, its words joined with `-`, every run of other
/// characters replaced by `-`, and leading and trailing dashes trimmed.
/// Returns an empty string if the summary has no header.
///
/// # Examples
///
/// ```
/// use udocs_site::extract_route;
///
/// assert_eq!(extract_route(b"# My Test 1.0 (Route/Path)\n"), "my-test-1-0-route-path");
/// ```
#[must_use]
pub fn extract_route(summary: &[u8]) -> String {
    let Some(header) = parse_header(&String::from_utf8_lossy(summary)) else {
        return String::new();
    };

    let joined = header
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    NON_ALPHANUMERIC_RE
        .replace_all(&joined, "-")
        .trim_matches('-')
        .to_owned()
}
