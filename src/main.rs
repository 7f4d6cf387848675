#![forbid(unsafe_code)]
//! Slice Bundler Command Line Interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use slice_bundler::commands::{
    execute_analyze, execute_build, execute_clean, execute_info, AnalyzeOptions, BuildOptions,
    CleanOptions, InfoOptions,
};
use slice_bundler::config::CONFIG_FILE;
use slice_bundler::{Config, StrategyMode};

#[derive(Parser)]
#[command(name = "slice-bundle")]
#[command(about = "Dependency analysis and bundle generation for Slice.js projects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file path (defaults to <root>/.slice-bundle.json)
    #[arg(short, long, global = true, env = "SLICE_BUNDLE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze dependencies and generate bundles
    Build {
        /// Force a strategy (auto, global, hybrid, per-route)
        #[arg(short, long)]
        strategy: Option<StrategyMode>,

        /// Print the dependency analysis before building
        #[arg(short, long)]
        analyze: bool,
    },

    /// Print the dependency analysis without writing anything
    Analyze {
        /// Output metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configuration of the last build
    Info,

    /// Remove generated bundles and configuration
    Clean,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let path = cli.root.join(CONFIG_FILE);
            if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Build { strategy, analyze } => {
            let options = BuildOptions {
                root: cli.root,
                strategy,
                analyze,
                verbose: cli.verbose,
            };
            execute_build(options, config)?;
        }

        Commands::Analyze { json } => {
            let options = AnalyzeOptions { root: cli.root, json };
            execute_analyze(options, config)?;
        }

        Commands::Info => {
            execute_info(InfoOptions { root: cli.root }, config)?;
        }

        Commands::Clean => {
            execute_clean(CleanOptions { root: cli.root }, config)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", style("✗").red(), err);
        std::process::exit(1);
    }
}
