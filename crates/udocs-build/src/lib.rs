//! Build pipeline for udocs guides.
//!
//! This crate turns a `docs/` directory into stored pages:
//! - [`validate`]: layout checks for a docs directory
//! - [`build`]: render, store, load external pages and index a guide
//! - [`update_search_index`]: re-index a guide's pages from storage
//! - [`destroy_route`]: remove a guide and empty its sidebar entry
//! - [`ContentSource`] and [`QuipClient`]: pages hosted outside the docs directory
//! - [`watch`]: rebuild on Markdown changes
//! - [`pack`] and [`unpack`]: gzipped tarballs for publishing
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use udocs_build::{build, validate};
//! use udocs_storage::FsStorage;
//!
//! let docs = Path::new("docs");
//! validate(docs)?;
//! let storage = FsStorage::open("_docs", Path::new("_docs/search"))?;
//! let summary = build("guide", docs, &storage, &[])?;
//! println!("Built {}", summary.header);
//! # Ok(())
//! # }
//! ```

mod archive;
mod build;
mod content;
mod error;
mod template;
mod validate;
pub mod watch;

pub use archive::{ArchiveError, pack, unpack};
pub use build::{build, destroy_route, is_valid_route, update_search_index};
pub use content::{ContentError, ContentSource, QuipClient};
pub use error::{BuildError, ValidationError};
pub use template::PageTemplate;
pub use validate::{DOCS_DIR, validate};
