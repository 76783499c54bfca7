//! Shrinkray CLI: optimizes a tree of source images into an output tree,
//! re-encoding only the files that changed since the last run.

#![warn(missing_docs)]

mod project;
mod run;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Shrinkray: incremental image optimization.
#[derive(Parser, Debug)]
#[command(name = "shrinkray", version, about = "Incremental image optimizer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Path to a custom `shrinkray.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of files to process concurrently (overrides `run.jobs`).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Hash every source file instead of trusting size and mtime.
    #[arg(long)]
    pub verify_content: bool,

    /// Source files to process. Defaults to the whole source tree; paths
    /// outside the source root are ignored.
    pub paths: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(cli.quiet, cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}
