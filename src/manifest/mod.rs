//! Bundle Manifest
//!
//! The durable description of a run (`bundle.config.json`) and its directly
//! loadable companion (`bundle.config.js`). Both are fully overwritten on
//! every run. Maps are ordered so two runs over unchanged input differ only
//! in `generated`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::{Analysis, CategoryStats};
use crate::bundle::emit::{registrar_guard, BUNDLE_FORMAT_VERSION};
use crate::bundle::{BundleKind, BundlePlan, RenderedBundle, Strategy};
use crate::config::{OutputConfig, RuntimeConfig};
use crate::error::Result;

/// Aggregate statistics of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    pub total_components: usize,
    pub total_routes: usize,
    pub shared_components: usize,
    pub shared_percentage: f64,
    pub total_size: u64,
    pub critical_size: u64,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub by_route: BTreeMap<String, RouteStats>,
}

/// Footprint of one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStats {
    pub component: String,
    pub bundle: String,
    pub components: usize,
    pub size: u64,
}

/// One emitted artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    pub file: String,
    pub size: u64,
    pub hash: String,
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBundles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<BundleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<BundleEntry>,
    /// Secondary bundles by key
    #[serde(default)]
    pub routes: BTreeMap<String, BundleEntry>,
}

impl ManifestBundles {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleEntry)> {
        self.critical
            .iter()
            .map(|b| ("critical", b))
            .chain(self.global.iter().map(|b| ("global", b)))
            .chain(self.routes.iter().map(|(k, b)| (k.as_str(), b)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Machine-readable description of the emitted bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub version: String,
    pub strategy: Strategy,
    pub generated: String,
    pub stats: ManifestStats,
    pub bundles: ManifestBundles,
    /// Route path to the key of the bundle serving it
    pub routes: BTreeMap<String, String>,
    #[serde(default)]
    pub unreachable: Vec<String>,
}

impl BundleManifest {
    /// Assemble the manifest from a finished plan and its rendered artifacts
    pub fn build(
        analysis: &Analysis,
        plan: &BundlePlan,
        rendered: &[RenderedBundle],
        generated: &str,
    ) -> Self {
        let mut bundles = ManifestBundles::default();
        for bundle in plan.bundles() {
            let Some(artifact) = rendered.iter().find(|r| r.key == bundle.key) else {
                continue;
            };
            let entry = BundleEntry {
                paths: bundle.paths.clone(),
                file: artifact.file_name.clone(),
                size: artifact.size,
                hash: artifact.hash.clone(),
                components: artifact.components.clone(),
                omitted: artifact.omitted.clone(),
                dependencies: bundle.dependencies.clone(),
            };
            match bundle.kind {
                BundleKind::Critical => bundles.critical = Some(entry),
                BundleKind::Global => bundles.global = Some(entry),
                BundleKind::Secondary => {
                    bundles.routes.insert(bundle.key.clone(), entry);
                }
            }
        }

        let metrics = &analysis.metrics;
        let by_route = plan
            .routes
            .iter()
            .map(|r| {
                (
                    r.path.clone(),
                    RouteStats {
                        component: r.component.clone(),
                        bundle: r.bundle.clone(),
                        components: r.components,
                        size: r.size,
                    },
                )
            })
            .collect();

        Self {
            version: BUNDLE_FORMAT_VERSION.to_string(),
            strategy: plan.strategy,
            generated: generated.to_string(),
            stats: ManifestStats {
                total_components: metrics.total_components,
                total_routes: metrics.total_routes,
                shared_components: metrics.shared_components,
                shared_percentage: metrics.shared_percentage,
                total_size: metrics.total_size,
                critical_size: bundles.critical.as_ref().map(|b| b.size).unwrap_or(0),
                by_category: metrics.by_category.clone(),
                by_route,
            },
            bundles,
            routes: plan
                .routes
                .iter()
                .map(|r| (r.path.clone(), r.bundle.clone()))
                .collect(),
            unreachable: plan.unreachable.clone(),
        }
    }

    /// Load manifest from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Write manifest to JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// The bundle loaded up front: critical, or global when there is none
    pub fn always_on(&self) -> Option<&BundleEntry> {
        self.bundles.critical.as_ref().or(self.bundles.global.as_ref())
    }

    /// The same manifest with the generation time blanked
    pub fn without_timestamp(&self) -> Self {
        Self {
            generated: String::new(),
            ..self.clone()
        }
    }

    /// Companion module exporting the manifest. When the runtime registrar is
    /// present it receives the config as `bundleConfig` and the always-on
    /// bundle is imported once.
    pub fn to_companion_js(&self, runtime: &RuntimeConfig) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        let (guard, registrar) = registrar_guard(runtime);

        let mut out = format!(
            "/**\n * Slice.js Bundle Configuration\n * Generated: {}\n * Strategy: {}\n */\n\nexport const SLICE_BUNDLE_CONFIG = {};\n",
            self.generated, self.strategy, json
        );
        out.push_str(&format!(
            "\n// Auto-initialization if the runtime is available\nif ({}) {{\n  {}.bundleConfig = SLICE_BUNDLE_CONFIG;\n",
            guard, registrar
        ));
        if let Some(entry) = self.always_on() {
            out.push_str(&format!(
                "\n  if (!{r}.criticalBundleLoaded) {{\n    import('./{f}').catch((error) =>\n      console.warn('Failed to load bundle {f}:', error)\n    );\n    {r}.criticalBundleLoaded = true;\n  }}\n",
                r = registrar,
                f = entry.file
            ));
        }
        out.push_str("}\n");
        Ok(out)
    }

    /// Overwrite the manifest and companion files in `output_dir`
    pub fn persist(
        &self,
        output_dir: &Path,
        output: &OutputConfig,
        runtime: &RuntimeConfig,
    ) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(output_dir)?;
        let manifest_path = output_dir.join(&output.manifest);
        let companion_path = output_dir.join(&output.companion);
        self.write_json(&manifest_path)?;
        std::fs::write(&companion_path, self.to_companion_js(runtime)?)?;
        tracing::info!(
            "Wrote {} and {}",
            manifest_path.display(),
            companion_path.display()
        );
        Ok((manifest_path, companion_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> BundleManifest {
        let mut bundles = ManifestBundles::default();
        bundles.critical = Some(BundleEntry {
            paths: vec![],
            file: "slice-bundle.critical.js".to_string(),
            size: 2048,
            hash: "0123456789ab".to_string(),
            components: vec!["Navbar".to_string()],
            omitted: vec![],
            dependencies: vec![],
        });
        bundles.routes.insert(
            "docs".to_string(),
            BundleEntry {
                paths: vec!["/docs".to_string()],
                file: "slice-bundle.docs.js".to_string(),
                size: 1024,
                hash: "ba9876543210".to_string(),
                components: vec!["DocsPage".to_string()],
                omitted: vec!["Broken".to_string()],
                dependencies: vec!["critical".to_string()],
            },
        );
        BundleManifest {
            version: BUNDLE_FORMAT_VERSION.to_string(),
            strategy: Strategy::Hybrid,
            generated: "2026-01-01T00:00:00Z".to_string(),
            stats: ManifestStats {
                total_components: 3,
                total_routes: 1,
                shared_components: 0,
                shared_percentage: 0.0,
                total_size: 3072,
                critical_size: 2048,
                by_category: BTreeMap::new(),
                by_route: BTreeMap::new(),
            },
            bundles,
            routes: [("/docs".to_string(), "docs".to_string())].into_iter().collect(),
            unreachable: vec!["Orphan".to_string()],
        }
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(manifest()).unwrap();
        assert_eq!(value["version"], "2.0.0");
        assert_eq!(value["strategy"], "hybrid");
        assert_eq!(value["stats"]["criticalSize"], 2048);
        assert_eq!(value["bundles"]["routes"]["docs"]["dependencies"][0], "critical");
        assert_eq!(value["bundles"]["routes"]["docs"]["omitted"][0], "Broken");
        assert!(value["bundles"]["critical"].get("omitted").is_none());
        assert!(value["bundles"].get("global").is_none());
        assert_eq!(value["routes"]["/docs"], "docs");
    }

    #[test]
    fn test_persist_overwrites_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig::default();
        std::fs::write(dir.path().join(&output.manifest), "{ \"stale\": true }").unwrap();

        let manifest = manifest();
        let (json_path, js_path) = manifest
            .persist(dir.path(), &output, &RuntimeConfig::default())
            .unwrap();
        let loaded = BundleManifest::from_json(&json_path).unwrap();
        assert_eq!(loaded, manifest);

        let companion = std::fs::read_to_string(js_path).unwrap();
        assert!(companion.contains("export const SLICE_BUNDLE_CONFIG = {"));
        assert!(companion.contains("import('./slice-bundle.critical.js')"));
        assert!(companion.contains(
            "if (typeof window !== 'undefined' && window.slice && window.slice.controller) {"
        ));
        assert!(companion.contains("window.slice.controller.bundleConfig = SLICE_BUNDLE_CONFIG;"));
        assert!(companion.contains("if (!window.slice.controller.criticalBundleLoaded) {"));
        assert!(companion.contains("window.slice.controller.criticalBundleLoaded = true;"));
        let hand_off = companion.find(".bundleConfig = ").unwrap();
        assert!(hand_off < companion.find("import(").unwrap());
    }

    #[test]
    fn test_companion_follows_registrar() {
        let mut manifest = manifest();
        manifest.bundles.critical = None;
        let runtime = RuntimeConfig {
            registrar: "app.loader".to_string(),
            ..RuntimeConfig::default()
        };

        let companion = manifest.to_companion_js(&runtime).unwrap();
        assert!(companion.contains("typeof window !== 'undefined' && window.app && window.app.loader"));
        assert!(companion.contains("window.app.loader.bundleConfig = SLICE_BUNDLE_CONFIG;"));
        assert!(!companion.contains("import("));
        assert!(!companion.contains("criticalBundleLoaded"));
    }

    #[test]
    fn test_without_timestamp() {
        let a = manifest();
        let mut b = manifest();
        b.generated = "2027-06-30T12:00:00Z".to_string();
        assert_ne!(a, b);
        assert_eq!(a.without_timestamp(), b.without_timestamp());
    }
}
