//! Build command - one full pass over every declared bundle

use super::{load_project, print_diagnostics, print_json_report, print_summary};
use anyhow::{Context, Result};
use kiln_build::{BuildPass, Builder};
use std::path::PathBuf;

/// Build command arguments
#[derive(Default)]
pub struct BuildArgs {
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
    /// JSON output
    pub json: bool,
    /// Verbose output
    pub verbose: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let config = load_project(args.project_dir.as_deref())?;
    let builder = Builder::from_project(&config).context("Failed to prepare build")?;

    let pass = BuildPass::full();
    let report = builder.build(&pass).context("Build failed")?;
    pass.write_queue()
        .flush()
        .context("Failed to write bundles")?;

    if args.json {
        print_json_report(&report)?;
    } else {
        print_diagnostics(&report);
        if !args.quiet {
            print_summary(&report, &builder.config().bundle_dir(), args.verbose);
        }
    }

    if report.has_errors() {
        anyhow::bail!("Build finished with {} error(s)", report.error_count());
    }

    Ok(())
}
