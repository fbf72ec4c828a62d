//! Guide structure for udocs.
//!
//! This crate provides:
//! - [`parse_summary`]: the `SUMMARY.md` table of contents parsed into a [`Summary`]
//! - [`extract_route`]: the route slug derived from a summary header
//! - [`Sidebar`]: the registry of every published guide, persisted in storage
//!
//! # Quick Start
//!
//! ```
//! use udocs_site::{Sidebar, parse_summary};
//!
//! let summary = parse_summary("guide", b"# Guide\n* [Intro](README.md)\n").unwrap();
//! assert_eq!(summary.pages[0].path, "/guide/index.html");
//!
//! let mut sidebar = Sidebar::default();
//! sidebar.merge(summary);
//! assert_eq!(sidebar.routes().collect::<Vec<_>>(), ["guide"]);
//! ```

mod sidebar;
mod summary;

pub use sidebar::{Sidebar, SidebarError};
pub use summary::{Page, Pages, Summary, SummaryError, extract_route, parse_header, parse_summary};
