//! Commands working on a local docs directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use udocs_build::pack;
use udocs_config::Config;
use udocs_storage::FsStorage;

use super::{DirArgs, content_sources, route_from_summary};
use crate::error::CliError;
use crate::output::Output;

/// Output directory of `udocs build`.
const BUILD_DIR: &str = "_docs";

/// File written by `udocs tar`.
const TARBALL: &str = "docs.tar.gz";

/// Build the docs directory into a fresh `_docs` tree.
pub(crate) fn build(args: &DirArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let output = Output::new();
    let config = Config::load(config_path, None)?;

    check_dir(&args.dir)?;
    let route = route_from_summary(&args.dir)?;

    match fs::remove_dir_all(BUILD_DIR) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let build_dir = Path::new(BUILD_DIR);
    let storage = FsStorage::open(build_dir, &build_dir.join("search"))?;
    let summary = udocs_build::build(&route, &args.dir, &storage, &content_sources(&config))?;

    output.success(&format!(
        "Built \"{}\" ({} pages) into {BUILD_DIR}/{route}",
        summary.header,
        summary.iter().count()
    ));
    Ok(())
}

/// Check the docs directory layout.
pub(crate) fn validate(args: &DirArgs) -> Result<(), CliError> {
    let output = Output::new();
    check_dir(&args.dir)?;
    output.success("Validation successful.");
    Ok(())
}

/// Write the docs directory to `docs.tar.gz`.
pub(crate) fn tar(args: &DirArgs) -> Result<(), CliError> {
    let output = Output::new();
    check_dir(&args.dir)?;

    let tarball = pack(&args.dir)?;
    fs::write(TARBALL, &tarball)?;

    output.success(&format!("Wrote {TARBALL} ({} bytes)", tarball.len()));
    Ok(())
}

/// Validate `dir`, rejecting the working directory itself.
pub(crate) fn check_dir(dir: &Path) -> Result<(), CliError> {
    let abs = std::path::absolute(dir)?;
    if abs == std::env::current_dir()? {
        return Err(CliError::Usage(
            "docs directory cannot be the current working directory".to_owned(),
        ));
    }
    udocs_build::validate(&abs)?;
    Ok(())
}
