//! Build command
//!
//! Runs the full pipeline and prints the run summary.

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::analysis::{format_kb, render_report};
use crate::bundler::{BuildOutcome, Bundler};
use crate::config::{Config, StrategyMode};

/// Options for the build command
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root
    pub root: PathBuf,
    /// Strategy override
    pub strategy: Option<StrategyMode>,
    /// Print the analysis report before building
    pub analyze: bool,
    /// List bundle members in the summary
    pub verbose: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            strategy: None,
            analyze: false,
            verbose: false,
        }
    }
}

/// Execute the build command
pub fn execute_build(options: BuildOptions, mut config: Config) -> Result<BuildOutcome> {
    if let Some(mode) = options.strategy {
        config.strategy.mode = mode;
    }

    println!("{} Analyzing components...", style("→").cyan());
    let bundler = Bundler::new(&options.root, config);
    let outcome = bundler.build()?;

    if options.analyze {
        println!();
        print!("{}", render_report(&outcome.analysis.metrics));
        println!();
    }

    print_summary(&outcome, options.verbose);
    Ok(outcome)
}

fn print_summary(outcome: &BuildOutcome, verbose: bool) {
    let plan = &outcome.plan;
    println!(
        "{} Generated {} bundles ({} strategy)",
        style("✓").green(),
        outcome.rendered.len(),
        plan.strategy
    );

    for artifact in &outcome.rendered {
        println!(
            "  {} {} components, {}  {}",
            style(&artifact.file_name).bold(),
            artifact.components.len(),
            format_kb(artifact.size),
            style(&artifact.hash).dim()
        );
        if verbose {
            println!("    {}", artifact.components.join(", "));
        }
    }

    let total = outcome.analysis.metrics.total_components;
    println!(
        "  Requests: {} components in {} files ({:.1}% fewer requests)",
        total,
        outcome.rendered.len(),
        outcome.request_reduction()
    );
    println!(
        "{} Config written to {}",
        style("✓").green(),
        outcome.manifest_path.display()
    );

    if !outcome.warnings.is_empty() {
        println!();
        println!(
            "{} {} warnings:",
            style("⚠").yellow(),
            outcome.warnings.len()
        );
        for warning in &outcome.warnings {
            println!("  [{}] {}", warning.kind.as_str(), warning);
        }
    }
}
