//! Watch mode - incremental rebuilds on file changes

use super::{load_project, print_diagnostics, print_json_report, print_summary};
use anyhow::{Context, Result};
use kiln_build::{BuildPass, Builder, ChangeSet, ComponentManifest};
use kiln_config::Config;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Quiet period that ends a burst of file events
const DEBOUNCE_MS: u64 = 300;

/// Extensions of modules that can feed a bundle
const MODULE_EXTENSIONS: &[&str] = &["js", "mjs", "ts", "tsx", "jsx"];

/// Watch mode configuration
pub struct WatchConfig {
    /// Clear terminal before each rebuild
    pub clear_screen: bool,
    /// Use JSON output for reports
    pub json_output: bool,
    /// Show verbose timing information
    pub verbose: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            clear_screen: true,
            json_output: false,
            verbose: false,
        }
    }
}

/// What a burst of file events asks for
#[derive(Debug, PartialEq, Eq)]
enum Trigger {
    /// Project configuration or manifest changed
    Reload,
    /// Modules changed
    Changes(ChangeSet),
    Nothing,
}

/// Build the project once, then rebuild on every change until interrupted
pub fn run_watch(project_dir: Option<PathBuf>, config: WatchConfig) -> Result<()> {
    let mut project = load_project(project_dir.as_deref())?;
    let mut builder = Builder::from_project(&project).context("Failed to prepare build")?;

    let root = project
        .project_root()
        .map(Path::to_path_buf)
        .context("Project root unknown")?;

    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .context("Failed to start watching project")?;

    println!("Watching {} for changes...", root.display());
    println!("Press Ctrl+C to stop\n");

    run_pass(&builder, BuildPass::full(), &config);

    loop {
        let Some(paths) = next_burst(&rx) else {
            break;
        };

        let trigger = classify(&paths, &project, builder.manifest());
        debug!(?trigger, events = paths.len(), "file events");

        match trigger {
            Trigger::Nothing => continue,
            Trigger::Reload => {
                let reloaded = load_project(Some(root.as_path())).and_then(|p| {
                    let next = Builder::from_project(&p)?;
                    Ok((p, next))
                });
                match reloaded {
                    Ok((next_project, next_builder)) => {
                        let cache = std::mem::replace(&mut builder, next_builder).into_cache();
                        builder = builder.with_cache(cache);
                        project = next_project;
                    }
                    Err(e) => {
                        eprintln!("[watch] Failed to reload project: {:#}", e);
                        continue;
                    }
                }
                if config.clear_screen {
                    clear_terminal();
                }
                if config.verbose {
                    eprintln!("[watch] Project configuration changed, rebuilding everything...\n");
                }
                run_pass(&builder, BuildPass::full(), &config);
            }
            Trigger::Changes(change_set) => {
                let changed: Vec<&PathBuf> = change_set.changed_file_paths.iter().collect();
                match builder.registry().invalidate(&changed) {
                    Ok(dropped) => debug!(dropped, "invalidated cached modules"),
                    Err(e) => warn!(error = %e, "failed to invalidate module registry"),
                }
                if config.clear_screen {
                    clear_terminal();
                }
                if config.verbose {
                    eprintln!("[watch] {} file(s) changed, rebuilding...\n", changed.len());
                }
                run_pass(&builder, BuildPass::incremental(change_set), &config);
            }
        }
    }

    Ok(())
}

/// Wait for file events and collect paths until the debounce period passes quietly
///
/// Returns `None` when the watcher has gone away.
fn next_burst(rx: &Receiver<notify::Result<Event>>) -> Option<BTreeSet<PathBuf>> {
    let mut paths = BTreeSet::new();
    collect(rx.recv().ok()?, &mut paths);

    let debounce = Duration::from_millis(DEBOUNCE_MS);
    loop {
        match rx.recv_timeout(debounce) {
            Ok(event) => collect(event, &mut paths),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                return Some(paths)
            }
        }
    }
}

fn collect(event: notify::Result<Event>, paths: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event) if !matches!(event.kind, EventKind::Access(_)) => paths.extend(event.paths),
        Ok(_) => {}
        Err(e) => eprintln!("[watch] Error: {:?}", e),
    }
}

/// Decide what a set of changed paths asks for
///
/// Files under the build directory are ignored. A changed module whose stem
/// matches a component module is a component change; any other module is a
/// non-component change.
fn classify(paths: &BTreeSet<PathBuf>, project: &Config, manifest: &ComponentManifest) -> Trigger {
    let build_dir = project.build_dir();
    let config_path = project.config_path();
    let manifest_path = project.manifest_path();

    let mut change_set = ChangeSet::new();

    for path in paths {
        if path.starts_with(&build_dir) {
            continue;
        }
        if Some(path) == config_path.as_ref() || *path == manifest_path {
            return Trigger::Reload;
        }

        let is_module = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| MODULE_EXTENSIONS.contains(&e));
        if !is_module {
            continue;
        }

        let stem = path.file_stem().and_then(|s| s.to_str());
        let is_component = manifest
            .components()
            .iter()
            .any(|c| stem.is_some() && c.module_stem() == stem);

        change_set = if is_component {
            change_set.with_component_change(path)
        } else {
            change_set.with_non_component_change(path)
        };
    }

    if change_set.is_empty() {
        Trigger::Nothing
    } else {
        Trigger::Changes(change_set)
    }
}

fn run_pass(builder: &Builder, pass: BuildPass, config: &WatchConfig) {
    let start = Instant::now();

    let report = match builder.build(&pass) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("[watch] Build failed: {}", e);
            return;
        }
    };
    if let Err(e) = pass.write_queue().flush() {
        eprintln!("[watch] Failed to write bundles: {}", e);
        return;
    }

    if config.json_output {
        if let Err(e) = print_json_report(&report) {
            eprintln!("[watch] {:#}", e);
        }
    } else {
        print_diagnostics(&report);
        print_summary(&report, &builder.config().bundle_dir(), config.verbose);
    }

    if config.verbose {
        eprintln!(
            "\n[watch] Completed in {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    if !config.json_output {
        println!("Watching for changes...");
    }
}

/// Clear the terminal screen
fn clear_terminal() {
    print!("\x1B[2J\x1B[1;1H");
}
