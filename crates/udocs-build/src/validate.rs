//! Docs directory layout checks.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use udocs_renderer::paths::{README_MD, SUMMARY_MD};

use crate::error::ValidationError;

/// Required base name of a docs directory.
pub const DOCS_DIR: &str = "docs";

/// Check that `dir` is a publishable docs directory.
///
/// The directory must be named `docs` and contain `README.md` and
/// `SUMMARY.md` as regular files at its root.
pub fn validate(dir: &Path) -> Result<(), ValidationError> {
    if dir.file_name() != Some(OsStr::new(DOCS_DIR)) {
        return Err(ValidationError::NotDocsDir(dir.to_path_buf()));
    }

    let unreadable = |source| ValidationError::Unreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if entry.file_type().map_err(unreadable)?.is_file() {
            files.push(entry.file_name());
        }
    }

    for required in [README_MD, SUMMARY_MD] {
        if !files.iter().any(|name| name == required) {
            return Err(ValidationError::MissingFile(required));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn docs_dir(files: &[&str]) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join(DOCS_DIR);
        fs::create_dir(&docs).unwrap();
        for file in files {
            fs::write(docs.join(file), "# Title\n").unwrap();
        }
        (temp, docs)
    }

    #[test]
    fn test_validate_accepts_complete_docs_dir() {
        let (_temp, docs) = docs_dir(&[README_MD, SUMMARY_MD, "extra.md"]);
        validate(&docs).unwrap();
    }

    #[test]
    fn test_validate_requires_docs_base_name() {
        let temp = TempDir::new().unwrap();
        let err = validate(temp.path()).unwrap_err();
        assert!(matches!(err, ValidationError::NotDocsDir(_)));
    }

    #[test]
    fn test_validate_requires_readme_and_summary() {
        let (_temp, docs) = docs_dir(&[SUMMARY_MD]);
        let err = validate(&docs).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFile(README_MD)));

        let (_temp, docs) = docs_dir(&[README_MD]);
        let err = validate(&docs).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFile(SUMMARY_MD)));
    }

    #[test]
    fn test_validate_rejects_directory_named_like_required_file() {
        let (_temp, docs) = docs_dir(&[README_MD]);
        fs::create_dir(docs.join(SUMMARY_MD)).unwrap();
        let err = validate(&docs).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFile(SUMMARY_MD)));
    }

    #[test]
    fn test_validate_missing_directory_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let err = validate(&temp.path().join(DOCS_DIR)).unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }
}
