//! Gzipped tarballs of docs directories.
//!
//! A tarball holds a single top-level `docs/` directory. It is what
//! `udocs publish` uploads and what the server unpacks before a build.

use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder};

use crate::validate::DOCS_DIR;

/// Error returned when a tarball cannot be written or unpacked.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Reading, compressing or extracting failed.
    #[error("Archive I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The unpacked archive has no top-level docs directory.
    #[error("Archive does not contain a 'docs' directory")]
    MissingDocs,
}

/// Pack `dir` into a gzipped tarball rooted at `docs/`.
pub fn pack(dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.append_dir_all(DOCS_DIR, dir)?;

    let bytes = builder.into_inner()?.finish()?;
    tracing::debug!(dir = %dir.display(), bytes = bytes.len(), "Packed docs tarball");
    Ok(bytes)
}

/// Unpack a gzipped tarball into `dest` and return the path of its docs directory.
///
/// Entries that would land outside `dest` are skipped.
pub fn unpack(data: &[u8], dest: &Path) -> Result<PathBuf, ArchiveError> {
    Archive::new(GzDecoder::new(data)).unpack(dest)?;

    let docs = dest.join(DOCS_DIR);
    if !docs.is_dir() {
        return Err(ArchiveError::MissingDocs);
    }
    Ok(docs)
}
