//! Bundle Emitter
//!
//! Renders each bundle into a self-registering JavaScript artifact:
//!
//! ```text
//! /** header comment */
//! export const SLICE_BUNDLE = { metadata, components };
//! if (typeof window !== 'undefined' && window.slice && window.slice.controller) {
//!   window.slice.controller.registerBundle(SLICE_BUNDLE);
//! }
//! ```
//!
//! Artifacts are rendered in parallel and returned in input order. The content
//! hash covers the artifact rendered without its timestamp, so unchanged input
//! always hashes the same.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use serde::{Serialize, Serializer};

use super::{Bundle, BundleKind, Strategy};
use crate::analysis::format_kb;
use crate::config::RuntimeConfig;
use crate::error::{BundlerError, Result, Warning, WarningKind};
use crate::registry::Registry;
use crate::workers::run_with_workers;

/// Format version written into artifacts and the manifest
pub const BUNDLE_FORMAT_VERSION: &str = "2.0.0";

/// `import ... from '...'` and `import '...'`, possibly spanning lines.
/// Group 1 is the module specifier.
static IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:[^;'"]*?\s*from\s*)?['"]([^'"]+)['"][ \t]*;?[ \t]*\r?\n?"#)
        .unwrap()
});

static EXPORT_DEFAULT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\s+").unwrap());

static EXPORT_DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+(class|function|const|let|var|async)\b").unwrap()
});

/// One component as carried inside an artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPayload {
    pub name: String,
    pub category: String,
    pub category_type: String,
    /// Primary source with module syntax removed
    pub js: String,
    /// Relative non-component imports, keyed by file stem
    pub external_dependencies: BTreeMap<String, String>,
    pub component_dependencies: Vec<String>,
    /// `null` when the component has no markup file
    pub html: Option<String>,
    pub css: Option<String>,
    pub size: u64,
}

/// Serializes payloads as an object keyed by name, in bundle order
struct OrderedComponents<'a>(&'a [ComponentPayload]);

impl Serialize for OrderedComponents<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|c| (&c.name, c)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleMetadata<'a> {
    version: &'static str,
    #[serde(rename = "type")]
    kind: BundleKind,
    key: &'a str,
    routes: &'a [String],
    dependencies: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    generated: Option<&'a str>,
    total_size: u64,
    component_count: usize,
    strategy: Strategy,
}

#[derive(Serialize)]
struct BundleDocument<'a> {
    metadata: BundleMetadata<'a>,
    components: OrderedComponents<'a>,
}

/// A bundle rendered to artifact text
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBundle {
    pub key: String,
    pub kind: BundleKind,
    pub file_name: String,
    pub content: String,
    /// First 12 hex digits of the md5 of the timestamp-free rendering
    pub hash: String,
    /// Sum of the emitted component sizes
    pub size: u64,
    /// Components actually emitted
    pub components: Vec<String>,
    /// Components left out because their source was missing
    pub omitted: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Strip module linkage so the source evaluates standalone, publish the
/// class on `window` and return it.
pub fn clean_source(source: &str, name: &str) -> String {
    let without_imports = IMPORT_PATTERN.replace_all(source, "");
    let without_default = EXPORT_DEFAULT_PATTERN.replace_all(&without_imports, "");
    let mut cleaned = EXPORT_DECLARATION_PATTERN
        .replace_all(&without_default, "${1}${2}")
        .trim()
        .to_string();

    let publish = format!("window.{0} = {0};\n", name);
    match cleaned.find("customElements.define") {
        Some(pos) => {
            let line_start = cleaned[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
            cleaned.insert_str(line_start, &publish);
        }
        None => {
            cleaned.push('\n');
            cleaned.push_str(&publish);
        }
    }
    if !cleaned.ends_with('\n') {
        cleaned.push('\n');
    }
    cleaned.push_str(&format!("return {};", name));
    cleaned
}

/// Relative imports that are not components (`./utils.js`, `../helpers/x.js`)
pub fn relative_imports(source: &str) -> Vec<String> {
    IMPORT_PATTERN
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|specifier| {
            (specifier.starts_with("./") || specifier.starts_with("../"))
                && !specifier.contains("/Components/")
        })
        .collect()
}

/// First 12 hex digits of the md5 digest
pub fn content_hash(content: &str) -> String {
    let digest = format!("{:x}", md5::compute(content.as_bytes()));
    digest[..12].to_string()
}

/// `if (<guards>) { window.<registrar>.<method>(SLICE_BUNDLE); }`
fn registration_footer(runtime: &RuntimeConfig) -> String {
    let (guard, target) = registrar_guard(runtime);
    format!(
        "// Auto-registration of components\nif ({}) {{\n  {}.{}(SLICE_BUNDLE);\n}}\n",
        guard, target, runtime.register_method
    )
}

/// Guard expression checking every segment of the registrar exists, and the
/// registrar's full `window.` path
pub(crate) fn registrar_guard(runtime: &RuntimeConfig) -> (String, String) {
    let mut guards = vec!["typeof window !== 'undefined'".to_string()];
    let mut target = "window".to_string();
    for segment in runtime.registrar.split('.').filter(|s| !s.is_empty()) {
        target.push('.');
        target.push_str(segment);
        guards.push(target.clone());
    }
    (guards.join(" && "), target)
}

/// Renders bundles against a loaded registry
pub struct BundleEmitter<'a> {
    registry: &'a Registry,
    strategy: Strategy,
    runtime: &'a RuntimeConfig,
    generated: Option<String>,
    workers: Option<usize>,
}

impl<'a> BundleEmitter<'a> {
    pub fn new(registry: &'a Registry, strategy: Strategy, runtime: &'a RuntimeConfig) -> Self {
        Self {
            registry,
            strategy,
            runtime,
            generated: None,
            workers: None,
        }
    }

    /// Stamp artifacts with a generation time
    pub fn with_timestamp(mut self, generated: impl Into<String>) -> Self {
        self.generated = Some(generated.into());
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Read a component's files. `Err` means the primary source is missing
    /// and the component must be left out.
    pub fn load_payload(
        &self,
        name: &str,
    ) -> std::result::Result<(ComponentPayload, Vec<Warning>), Warning> {
        let Some(record) = self.registry.get(name) else {
            return Err(Warning::emit(
                WarningKind::MissingFile,
                Some(name),
                "not registered, omitted from bundle",
            ));
        };
        let source_path = record.source_path();
        let source = std::fs::read_to_string(&source_path).map_err(|e| {
            Warning::emit(
                WarningKind::MissingFile,
                Some(name),
                format!("cannot read {} ({}), omitted from bundle", source_path.display(), e),
            )
        })?;

        let mut warnings = Vec::new();
        let mut external_dependencies = BTreeMap::new();
        for specifier in relative_imports(&source) {
            let path = record.dir.join(&specifier);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| specifier.clone());
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    external_dependencies.insert(stem, content);
                }
                Err(e) => warnings.push(Warning::emit(
                    WarningKind::MissingFile,
                    Some(name),
                    format!("cannot read imported file {} ({})", path.display(), e),
                )),
            }
        }

        let payload = ComponentPayload {
            name: record.name.clone(),
            category: record.category.clone(),
            category_type: record.kind.as_str().to_string(),
            js: clean_source(&source, &record.name),
            external_dependencies,
            component_dependencies: record
                .dependencies
                .iter()
                .filter(|d| self.registry.contains(d))
                .cloned()
                .collect(),
            html: std::fs::read_to_string(record.markup_path()).ok(),
            css: std::fs::read_to_string(record.style_path()).ok(),
            size: record.size,
        };
        Ok((payload, warnings))
    }

    fn render_artifact(
        &self,
        bundle: &Bundle,
        payloads: &[ComponentPayload],
        size: u64,
        generated: Option<&str>,
    ) -> Result<String> {
        let document = BundleDocument {
            metadata: BundleMetadata {
                version: BUNDLE_FORMAT_VERSION,
                kind: bundle.kind,
                key: &bundle.key,
                routes: &bundle.paths,
                dependencies: &bundle.dependencies,
                generated,
                total_size: size,
                component_count: payloads.len(),
                strategy: self.strategy,
            },
            components: OrderedComponents(payloads),
        };
        let body = serde_json::to_string_pretty(&document)?;

        let mut header = String::from("/**\n * Slice.js Bundle\n");
        header.push_str(&format!(" * Type: {}\n", bundle.kind.as_str()));
        header.push_str(&format!(" * Key: {}\n", bundle.key));
        if !bundle.paths.is_empty() {
            header.push_str(&format!(" * Routes: {}\n", bundle.paths.join(", ")));
        }
        if let Some(generated) = generated {
            header.push_str(&format!(" * Generated: {}\n", generated));
        }
        header.push_str(&format!(" * Strategy: {}\n", self.strategy));
        header.push_str(&format!(" * Components: {}\n", payloads.len()));
        header.push_str(&format!(" * Total Size: {}\n */\n", format_kb(size)));

        Ok(format!(
            "{}\nexport const SLICE_BUNDLE = {};\n\n{}",
            header,
            body,
            registration_footer(self.runtime)
        ))
    }

    /// Render one bundle, omitting components whose source is missing
    pub fn render(&self, bundle: &Bundle) -> Result<RenderedBundle> {
        let mut payloads = Vec::new();
        let mut omitted = Vec::new();
        let mut warnings = Vec::new();
        for name in &bundle.components {
            match self.load_payload(name) {
                Ok((payload, payload_warnings)) => {
                    warnings.extend(payload_warnings);
                    payloads.push(payload);
                }
                Err(warning) => {
                    omitted.push(name.clone());
                    warnings.push(warning);
                }
            }
        }

        let size = payloads.iter().map(|p| p.size).sum();
        let stable = self.render_artifact(bundle, &payloads, size, None)?;
        let hash = content_hash(&stable);
        let content = match self.generated.as_deref() {
            Some(generated) => self.render_artifact(bundle, &payloads, size, Some(generated))?,
            None => stable,
        };

        tracing::debug!(
            "Rendered {} ({} components, hash {})",
            bundle.file_name(),
            payloads.len(),
            hash
        );
        Ok(RenderedBundle {
            key: bundle.key.clone(),
            kind: bundle.kind,
            file_name: bundle.file_name(),
            content,
            hash,
            size,
            components: payloads.into_iter().map(|p| p.name).collect(),
            omitted,
            warnings,
        })
    }

    /// Render every bundle in parallel; results keep the input order
    pub fn render_all(&self, bundles: &[&Bundle]) -> Result<Vec<RenderedBundle>> {
        run_with_workers(self.workers, || {
            bundles
                .par_iter()
                .map(|bundle| self.render(bundle))
                .collect::<Result<Vec<_>>>()
        })
    }
}

/// Existing `slice-bundle.*.js` artifacts in `output_dir`
pub fn existing_artifacts(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/slice-bundle.*.js",
        glob::Pattern::escape(&output_dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern).map_err(|e| BundlerError::Config(e.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| BundlerError::Io(e.into_error()))?);
    }
    Ok(paths)
}

/// Write the artifacts, then remove artifacts from earlier runs that are not
/// part of this one. Nothing is removed unless every write succeeded.
pub fn write_artifacts(output_dir: &Path, rendered: &[RenderedBundle]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    if let Some(bad) = rendered.iter().find(|r| !is_plain_file_name(&r.file_name)) {
        return Err(BundlerError::Config(format!(
            "invalid artifact file name '{}'",
            bad.file_name
        )));
    }

    let mut written = Vec::with_capacity(rendered.len());
    for artifact in rendered {
        let path = output_dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.content)?;
        written.push(path);
    }

    let current: HashSet<&str> = rendered.iter().map(|r| r.file_name.as_str()).collect();
    for stale in existing_artifacts(output_dir)? {
        let name = stale.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.as_deref().map(|n| !current.contains(n)).unwrap_or(true) {
            tracing::debug!("Removing stale artifact {}", stale.display());
            std::fs::remove_file(&stale)?;
        }
    }
    Ok(written)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CategoryKind, ComponentRecord};
    use std::fs;

    const BUTTON_SOURCE: &str = r#"import Helper from './helper.js';
import Icon from '../../Components/Visual/Icon/Icon.js';

export default class Button extends HTMLElement {
  constructor() {
    super();
  }
}

customElements.define('slice-button', Button);
"#;

    fn component(root: &Path, name: &str, source: Option<&str>) -> ComponentRecord {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(source) = source {
            fs::write(dir.join(format!("{}.js", name)), source).unwrap();
        }
        ComponentRecord::new(name, "Visual", CategoryKind::Visual, dir, 100)
    }

    fn bundle(components: &[&str]) -> Bundle {
        let mut bundle = Bundle::new("docs", BundleKind::Secondary);
        bundle.paths = vec!["/docs".to_string()];
        bundle.dependencies = vec!["critical".to_string()];
        bundle.components = components.iter().map(|c| c.to_string()).collect();
        bundle
    }

    #[test]
    fn test_clean_source() {
        let cleaned = clean_source(BUTTON_SOURCE, "Button");
        assert!(!cleaned.contains("import"));
        assert!(!cleaned.contains("export"));
        assert!(cleaned.starts_with("class Button extends HTMLElement"));
        assert!(cleaned.contains("window.Button = Button;\ncustomElements.define('slice-button', Button);"));
        assert!(cleaned.ends_with("return Button;"));
    }

    #[test]
    fn test_clean_source_without_define() {
        let cleaned = clean_source("export class FetchManager {}\n", "FetchManager");
        assert_eq!(
            cleaned,
            "class FetchManager {}\nwindow.FetchManager = FetchManager;\nreturn FetchManager;"
        );
    }

    #[test]
    fn test_relative_imports() {
        assert_eq!(relative_imports(BUTTON_SOURCE), vec!["./helper.js"]);
    }

    #[test]
    fn test_registration_footer() {
        let footer = registration_footer(&RuntimeConfig::default());
        assert!(footer.contains(
            "if (typeof window !== 'undefined' && window.slice && window.slice.controller) {"
        ));
        assert!(footer.contains("window.slice.controller.registerBundle(SLICE_BUNDLE);"));
    }

    #[test]
    fn test_render_payload_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        let mut button = component(dir.path(), "Button", Some(BUTTON_SOURCE));
        button.dependencies = vec!["Icon".to_string(), "Unknown".to_string()];
        fs::write(button.dir.join("helper.js"), "export const help = 1;").unwrap();
        fs::write(button.dir.join("Button.css"), ".btn {}").unwrap();
        registry.insert(button);
        registry.insert(component(dir.path(), "Icon", Some("export default class Icon {}")));

        let runtime = RuntimeConfig::default();
        let stamped = BundleEmitter::new(&registry, Strategy::Hybrid, &runtime)
            .with_timestamp("2026-01-01T00:00:00Z")
            .render(&bundle(&["Button", "Icon"]))
            .unwrap();
        let plain = BundleEmitter::new(&registry, Strategy::Hybrid, &runtime)
            .render(&bundle(&["Button", "Icon"]))
            .unwrap();

        assert_eq!(stamped.hash, plain.hash);
        assert_eq!(stamped.hash.len(), 12);
        assert_ne!(stamped.content, plain.content);
        assert!(stamped.content.contains(" * Generated: 2026-01-01T00:00:00Z"));
        assert!(!plain.content.contains("generated"));
        assert!(plain.content.contains("export const SLICE_BUNDLE = {"));
        assert!(plain.content.contains("\"componentDependencies\": [\n        \"Icon\"\n      ]"));
        assert!(plain.content.contains("\"helper\": \"export const help = 1;\""));
        assert!(plain.content.contains("\"css\": \".btn {}\""));
        assert!(plain.content.contains("\"html\": null"));
        assert!(plain.content.find("\"Button\": {").unwrap() < plain.content.find("\"Icon\": {").unwrap());
        assert_eq!(plain.components, vec!["Button", "Icon"]);
        assert_eq!(plain.size, 200);
    }

    #[test]
    fn test_missing_source_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        registry.insert(component(dir.path(), "Present", Some("class Present {}")));
        registry.insert(component(dir.path(), "Gone", None));

        let runtime = RuntimeConfig::default();
        let rendered = BundleEmitter::new(&registry, Strategy::PerRoute, &runtime)
            .render(&bundle(&["Gone", "Present"]))
            .unwrap();
        assert_eq!(rendered.components, vec!["Present"]);
        assert_eq!(rendered.omitted, vec!["Gone"]);
        assert_eq!(rendered.warnings.len(), 1);
        assert_eq!(rendered.warnings[0].kind, WarningKind::MissingFile);
    }

    #[test]
    fn test_render_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        let mut bundles = Vec::new();
        for i in 0..8 {
            let name = format!("C{}", i);
            registry.insert(component(dir.path(), &name, Some("class X {}")));
            let mut b = Bundle::new(&format!("b{}", i), BundleKind::Secondary);
            b.components = vec![name];
            bundles.push(b);
        }
        let runtime = RuntimeConfig::default();
        let refs: Vec<&Bundle> = bundles.iter().collect();
        let rendered = BundleEmitter::new(&registry, Strategy::PerRoute, &runtime)
            .with_workers(Some(3))
            .render_all(&refs)
            .unwrap();
        let keys: Vec<&str> = rendered.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7"]);
    }

    #[test]
    fn test_write_artifacts_removes_stale() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bundles");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("slice-bundle.old.js"), "old").unwrap();
        fs::write(out.join("keep.txt"), "keep").unwrap();

        let rendered = RenderedBundle {
            key: "critical".to_string(),
            kind: BundleKind::Critical,
            file_name: "slice-bundle.critical.js".to_string(),
            content: "export const SLICE_BUNDLE = {};".to_string(),
            hash: content_hash("x"),
            size: 0,
            components: vec![],
            omitted: vec![],
            warnings: vec![],
        };
        write_artifacts(&out, &[rendered]).unwrap();
        assert!(!out.join("slice-bundle.old.js").exists());
        assert!(out.join("keep.txt").exists());
        assert!(out.join("slice-bundle.critical.js").exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bundles");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("slice-bundle.old.js"), "old").unwrap();

        let artifact = |key: &str, file_name: &str| RenderedBundle {
            key: key.to_string(),
            kind: BundleKind::Secondary,
            file_name: file_name.to_string(),
            content: "export const SLICE_BUNDLE = {};".to_string(),
            hash: content_hash(key),
            size: 0,
            components: vec![],
            omitted: vec![],
            warnings: vec![],
        };
        let result = write_artifacts(
            &out,
            &[artifact("docs", "slice-bundle.docs.js"), artifact("a/b", "slice-bundle.a/b.js")],
        );

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(out.join("slice-bundle.old.js")).unwrap(), "old");
        assert!(!out.join("slice-bundle.docs.js").exists());
        assert!(!out.join("slice-bundle.a").exists());
    }
}
