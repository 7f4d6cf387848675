//! Analyze command
//!
//! Runs the analysis stages only and prints the report. Writes nothing.

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::analysis::{render_report, Analyzer};
use crate::bundle::resolve_strategy;
use crate::config::Config;

/// Options for the analyze command
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Project root
    pub root: PathBuf,
    /// Print metrics as JSON
    pub json: bool,
}

/// Execute the analyze command
pub fn execute_analyze(options: AnalyzeOptions, config: Config) -> Result<()> {
    let analyzer = Analyzer::new(&options.root, config);
    let analysis = analyzer.analyze()?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&analysis.metrics)?);
        return Ok(());
    }

    println!("{} Dependency analysis", style("→").cyan());
    println!();
    print!("{}", render_report(&analysis.metrics));

    let strategy = resolve_strategy(&analysis.metrics, &analyzer.config().strategy);
    println!();
    println!("Recommended strategy: {}", style(strategy).bold());

    if !analysis.warnings.is_empty() {
        println!();
        println!("{} {} warnings:", style("⚠").yellow(), analysis.warnings.len());
        for warning in &analysis.warnings {
            println!("  [{}] {}", warning.kind.as_str(), warning);
        }
    }
    Ok(())
}
