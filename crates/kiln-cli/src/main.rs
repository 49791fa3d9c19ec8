use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

/// Kiln incremental component bundler.
///
/// Kiln groups compiled web components into bundles declared in kiln.toml
/// and writes one JavaScript module per bundle.
///
/// EXAMPLES:
///     kiln build                   Build every declared bundle
///     kiln build --json            Print the build report as JSON
///     kiln watch                   Rebuild bundles on file changes
///     kiln components              List the components of the manifest
///
/// ENVIRONMENT VARIABLES:
///     KILN_JSON         Set to '1' for JSON output by default
///     KILN_NAMESPACE    Override the project namespace
///     KILN_BUILD_DIR    Override the build directory
///     KILN_MINIFY       Set to '1' to minify bundles
///     RUST_LOG          Log filter (e.g. 'kiln_build=debug')
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every declared bundle once
    ///
    /// Resolves the components of each bundle declared in kiln.toml, bundles
    /// them in parallel and writes the results to the build directory.
    /// Exits with an error when any bundle reported an error.
    ///
    /// EXAMPLES:
    ///     kiln build                      Build the current project
    ///     kiln build --project ui/        Build another project
    ///     kiln build --json               Output the report as JSON
    #[command(visible_alias = "b")]
    Build {
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project: Option<PathBuf>,
        /// JSON output
        #[arg(long)]
        json: bool,
        /// Verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Quiet output (errors only)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Rebuild bundles whenever project files change
    ///
    /// Runs a full build, then watches the project. Only bundles affected by
    /// a change are rebuilt; editing kiln.toml or the component manifest
    /// reloads the project and rebuilds everything.
    ///
    /// EXAMPLES:
    ///     kiln watch                   Watch the current project
    ///     kiln watch --no-clear        Keep previous output on screen
    #[command(visible_alias = "w")]
    Watch {
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project: Option<PathBuf>,
        /// Don't clear terminal before each rebuild
        #[arg(long)]
        no_clear: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
        /// Verbose output with timing information
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// List the components of the manifest
    ///
    /// Shows every component with its class, module and resolved variants.
    Components {
        /// Project directory (defaults to the current directory)
        #[arg(long, short = 'p')]
        project: Option<PathBuf>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Build { verbose, .. } | Commands::Watch { verbose, .. } => *verbose,
            Commands::Components { .. } => false,
        }
    }

    fn quiet(&self) -> bool {
        matches!(self, Commands::Build { quiet: true, .. })
    }
}

fn init_logging(verbose: bool, quiet: bool, no_color: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    if cli_config.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.command.verbose(), cli.command.quiet(), cli_config.no_color);

    match cli.command {
        Commands::Build {
            project,
            json,
            verbose,
            quiet,
        } => {
            // Command-line flag overrides environment variable
            let args = commands::build::BuildArgs {
                project_dir: project,
                json: json || cli_config.default_json,
                verbose,
                quiet,
            };
            commands::build::run(args)?;
        }
        Commands::Watch {
            project,
            no_clear,
            json,
            verbose,
        } => {
            let config = commands::watch::WatchConfig {
                clear_screen: !no_clear,
                json_output: json || cli_config.default_json,
                verbose,
            };
            commands::watch::run_watch(project, config)?;
        }
        Commands::Components { project, json } => {
            commands::components::run(project, json || cli_config.default_json)?;
        }
    }

    Ok(())
}
