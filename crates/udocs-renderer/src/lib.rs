//! Markdown rendering for udocs.
//!
//! This crate turns a Markdown page into the HTML fragment stored for it and
//! owns the mapping between source paths and published paths.
//!
//! # Architecture
//!
//! - [`paths`]: `README.md` / `index.html` and `.md` / `.html` path conversion
//! - [`render_markdown`]: GitHub-flavored Markdown rendered with pulldown-cmark,
//!   then rewritten through an html5ever DOM (links, images, code classes,
//!   tables, sanitization)
//!
//! # Example
//!
//! ```
//! use udocs_renderer::render_markdown;
//!
//! let html = render_markdown("guide", b"See [setup](setup.md)").unwrap();
//! assert_eq!(html, "<p>See <a href=\"/guide/setup.html\">setup</a></p>\n");
//! ```

pub mod paths;
mod transform;

pub use transform::{TransformError, markdown_to_html, render_markdown, rewrite_html};
