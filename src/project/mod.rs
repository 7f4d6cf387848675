//! Project Layout
//!
//! Resolves where a Slice.js project keeps its registry, category config,
//! route manifest and bundle output, and checks the required files exist.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{BundlerError, Result};

/// Resolved file locations for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub src_dir: PathBuf,
    pub components_manifest: PathBuf,
    pub slice_config: PathBuf,
    pub routes: PathBuf,
    pub output_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        let root = root.as_ref().to_path_buf();
        let src_dir = root.join(&config.paths.src);
        Self {
            components_manifest: src_dir.join(&config.paths.components_manifest),
            slice_config: src_dir.join(&config.paths.slice_config),
            routes: src_dir.join(&config.paths.routes),
            output_dir: src_dir.join(&config.paths.output),
            src_dir,
            root,
        }
    }

    /// Directory holding the registry; category folders live beside it by default
    pub fn components_dir(&self) -> PathBuf {
        self.components_manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.src_dir.clone())
    }

    /// Resolve a path from the category config (e.g. `/Components/Visual`) below `src`
    pub fn resolve_src_path(&self, configured: &str) -> PathBuf {
        let trimmed = configured.trim_start_matches(['/', '\\']);
        self.src_dir.join(trimmed)
    }

    /// Fail when a file the pipeline cannot run without is missing
    pub fn validate(&self) -> Result<()> {
        for required in [&self.components_manifest, &self.routes] {
            if !required.is_file() {
                let shown = required
                    .strip_prefix(&self.root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| required.clone());
                return Err(BundlerError::MissingProjectFile(shown));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = ProjectLayout::new("/app", &Config::default());
        assert_eq!(layout.src_dir, PathBuf::from("/app/src"));
        assert_eq!(
            layout.components_manifest,
            PathBuf::from("/app/src/Components/components.js")
        );
        assert_eq!(layout.routes, PathBuf::from("/app/src/routes.js"));
        assert_eq!(layout.output_dir, PathBuf::from("/app/src/bundles"));
        assert_eq!(layout.components_dir(), PathBuf::from("/app/src/Components"));
    }

    #[test]
    fn test_resolve_src_path_strips_leading_slash() {
        let layout = ProjectLayout::new("/app", &Config::default());
        assert_eq!(
            layout.resolve_src_path("/Components/Visual"),
            PathBuf::from("/app/src/Components/Visual")
        );
    }

    #[test]
    fn test_validate_reports_missing_routes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &Config::default());
        std::fs::create_dir_all(layout.components_dir()).unwrap();
        std::fs::write(&layout.components_manifest, "const components = {};").unwrap();

        let err = layout.validate().unwrap_err();
        assert!(matches!(err, BundlerError::MissingProjectFile(p) if p == Path::new("src/routes.js")));
    }
}
