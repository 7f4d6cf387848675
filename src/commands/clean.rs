//! Clean command
//!
//! Deletes generated artifacts, the manifest and its companion.

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::bundle::emit::existing_artifacts;
use crate::config::Config;
use crate::project::ProjectLayout;

/// Options for the clean command
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Project root
    pub root: PathBuf,
}

/// Execute the clean command, returning the removed files
pub fn execute_clean(options: CleanOptions, config: Config) -> Result<Vec<PathBuf>> {
    let layout = ProjectLayout::new(&options.root, &config);
    let output_dir = &layout.output_dir;
    if !output_dir.exists() {
        println!("{} Nothing to clean", style("✓").green());
        return Ok(Vec::new());
    }

    let mut targets = existing_artifacts(output_dir)?;
    for name in [&config.output.manifest, &config.output.companion] {
        let path = output_dir.join(name);
        if path.exists() {
            targets.push(path);
        }
    }

    for path in &targets {
        std::fs::remove_file(path)?;
        tracing::debug!("Removed {}", path.display());
    }
    println!(
        "{} Removed {} files from {}",
        style("✓").green(),
        targets.len(),
        output_dir.display()
    );
    Ok(targets)
}
