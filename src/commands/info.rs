//! Info command
//!
//! Prints the manifest of the last build.

use std::path::PathBuf;

use anyhow::{bail, Result};
use console::style;

use crate::analysis::format_kb;
use crate::config::Config;
use crate::manifest::BundleManifest;
use crate::project::ProjectLayout;

/// Options for the info command
#[derive(Debug, Clone)]
pub struct InfoOptions {
    /// Project root
    pub root: PathBuf,
}

/// Execute the info command
pub fn execute_info(options: InfoOptions, config: Config) -> Result<()> {
    let layout = ProjectLayout::new(&options.root, &config);
    let path = layout.output_dir.join(&config.output.manifest);
    if !path.exists() {
        bail!(
            "No bundle manifest at {}. Run 'slice-bundle build' first.",
            path.display()
        );
    }

    let manifest = BundleManifest::from_json(&path)?;
    let stats = &manifest.stats;
    println!("{} Bundle configuration", style("→").cyan());
    println!("  Version: {}", manifest.version);
    println!("  Strategy: {}", manifest.strategy);
    println!("  Generated: {}", manifest.generated);
    println!(
        "  Components: {} ({} shared, {:.1}%)",
        stats.total_components, stats.shared_components, stats.shared_percentage
    );
    println!("  Routes: {}", stats.total_routes);
    println!("  Total size: {}", format_kb(stats.total_size));
    println!("  Critical size: {}", format_kb(stats.critical_size));

    println!();
    println!("Bundles ({}):", manifest.bundles.len());
    for (key, entry) in manifest.bundles.iter() {
        println!(
            "  {} {} - {} components, {}",
            style(key).bold(),
            style(&entry.file).dim(),
            entry.components.len(),
            format_kb(entry.size)
        );
        if !entry.dependencies.is_empty() {
            println!("    depends on: {}", entry.dependencies.join(", "));
        }
        if !entry.omitted.is_empty() {
            println!("    omitted: {}", entry.omitted.join(", "));
        }
    }

    if !manifest.unreachable.is_empty() {
        println!();
        println!("Unreachable: {}", manifest.unreachable.join(", "));
    }
    Ok(())
}
