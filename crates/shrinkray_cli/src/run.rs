//! The image processing command.

use shrinkray_cache::JsonManifestStore;
use shrinkray_encode::CommandEncoder;
use shrinkray_pipeline::Pipeline;

use crate::project::load_project;
use crate::Cli;

/// Processes the selected images and prints a one-line summary.
///
/// Returns the process exit code.
pub fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let (root, mut config) = load_project(&cwd, cli.config.as_deref())?;

    if let Some(jobs) = cli.jobs {
        if jobs == 0 {
            return Err("--jobs must be at least 1".into());
        }
        config.run.jobs = jobs;
    }
    if cli.verify_content {
        config.cache.verify_content = true;
    }

    tracing::debug!(root = %root.display(), "project root");
    let store = JsonManifestStore::new(root.join(&config.paths.manifest));
    let encoder = CommandEncoder::from_config(&config.encoders);
    let pipeline = Pipeline::from_config(&root, &config, encoder).with_cwd(&cwd);

    let report = pipeline.run(&store, &cli.paths)?;

    if !cli.quiet {
        if report.nothing_to_do() {
            println!("No images to process.");
        } else {
            println!(
                "✓ Image processing complete! Updated {} file(s).",
                report.processed
            );
        }
    }
    Ok(0)
}
