//! `UDocs` CLI - Markdown guide publisher.
//!
//! Provides commands for:
//! - `build`, `validate`, `tar`: work on a local `docs` directory
//! - `serve`: Start the documentation server, rebuilding local docs on change
//! - `publish`, `destroy`: Manage a guide on a remote server
//! - `env`, `version`: Print settings and version

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DirArgs, ServeArgs};
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `UDocs` - publish Markdown guides as a searchable site.
#[derive(Parser)]
#[command(name = "udocs", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover udocs.toml).
    #[arg(short, long, global = true, env = "UDOCS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the docs directory into `_docs`.
    Build(DirArgs),
    /// Check that the docs directory can be published.
    Validate(DirArgs),
    /// Serve published guides and the local docs directory.
    Serve(ServeArgs),
    /// Pack the docs directory into a gzipped tarball.
    Tar(DirArgs),
    /// Publish the docs directory to the configured server.
    Publish(DirArgs),
    /// Remove the guide from the configured server.
    Destroy(DirArgs),
    /// Print effective settings as environment variables.
    Env,
    /// Print the version.
    Version,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Build(args) => commands::build(&args, config),
        Commands::Validate(args) => commands::validate(&args),
        Commands::Serve(args) => args.execute(config),
        Commands::Tar(args) => commands::tar(&args),
        Commands::Publish(args) => commands::publish(&args, config),
        Commands::Destroy(args) => commands::destroy(&args, config),
        Commands::Env => commands::env(config),
        Commands::Version => {
            output.data(&format!("UDocs v{VERSION}"));
            Ok(())
        }
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
