pub mod build;
pub mod components;
pub mod watch;

use anyhow::{Context, Result};
use colored::Colorize;
use kiln_build::{BuildReport, DiagnosticLevel};
use kiln_config::{Config, ConfigLoader};
use std::path::{Path, PathBuf};

/// Load the project containing `project_dir` (or the current directory)
///
/// The returned configuration has an absolute project root.
pub fn load_project(project_dir: Option<&Path>) -> Result<Config> {
    let start = match project_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let start = start
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", start.display()))?;

    let config = ConfigLoader::new()
        .load_from_directory(&start)
        .context("Failed to load kiln.toml")?;

    if !config.is_project() {
        anyhow::bail!(
            "Could not find kiln.toml in {} or any parent directory",
            start.display()
        );
    }

    Ok(config)
}

/// Print diagnostics to stderr, errors first
pub fn print_diagnostics(report: &BuildReport) {
    for diagnostic in &report.diagnostics {
        let rendered = diagnostic.to_human_string();
        match diagnostic.level {
            DiagnosticLevel::Error => eprintln!("{}", rendered.red()),
            DiagnosticLevel::Warning => eprintln!("{}", rendered.yellow()),
        }
    }
}

/// Print the report as one JSON document on stdout
pub fn print_json_report(report: &BuildReport) -> Result<()> {
    let json = serde_json::json!({
        "success": !report.has_errors(),
        "bundles": report.bundles,
        "diagnostics": report.diagnostics,
        "stats": report.stats,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&json).context("Failed to serialize build report")?
    );
    Ok(())
}

/// Human-readable pass summary
pub fn print_summary(report: &BuildReport, bundle_dir: &Path, verbose: bool) {
    let stats = &report.stats;
    let headline = format!(
        "Built {} bundle(s) in {:.2}s",
        stats.total,
        stats.elapsed.as_secs_f64()
    );

    println!("\n{}", "=".repeat(60));
    if report.has_errors() {
        println!("{}", headline.red().bold());
    } else {
        println!("{}", headline.green().bold());
    }
    println!("{}", "=".repeat(60));
    println!(
        "  Rebuilt: {}  Reused: {}  Failed: {}",
        stats.rebuilt, stats.reused, stats.failed
    );
    println!("  Written: {} file(s) to {}", stats.written, bundle_dir.display());
    if verbose {
        for name in report.bundles.values() {
            println!("    {}", bundle_file(bundle_dir, name).display());
        }
    }
    if report.error_count() + report.warning_count() > 0 {
        println!(
            "  Diagnostics: {} error(s), {} warning(s)",
            report.error_count(),
            report.warning_count()
        );
    }
    println!("{}", "=".repeat(60));
}

fn bundle_file(bundle_dir: &Path, name: &str) -> PathBuf {
    bundle_dir.join(format!("{}.js", name))
}
