//! Component Registry
//!
//! Loads the component → category registry (`components.js`) and the
//! category → directory configuration (`sliceConfig.json`), then produces one
//! [`ComponentRecord`] per registered component found on disk.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::ast::JsParser;
use crate::error::{BundlerError, Result, Warning, WarningKind};
use crate::project::ProjectLayout;

/// Category kind of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CategoryKind {
    #[default]
    Visual,
    Service,
    Structural,
    Provider,
}

impl CategoryKind {
    /// Kind implied by a category name; unknown categories are visual
    pub fn from_category(name: &str) -> Self {
        match name {
            "Service" => CategoryKind::Service,
            "Structural" => CategoryKind::Structural,
            "Provider" => CategoryKind::Provider,
            _ => CategoryKind::Visual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Visual => "Visual",
            CategoryKind::Service => "Service",
            CategoryKind::Structural => "Structural",
            CategoryKind::Provider => "Provider",
        }
    }
}

/// One inline `path → component` entry of a multiplex declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexEntry {
    pub path: String,
    pub component: String,
}

/// A registered component and everything later stages learn about it
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRecord {
    pub name: String,
    pub category: String,
    pub kind: CategoryKind,
    /// Component directory
    pub dir: PathBuf,
    /// Sum of the sizes of the files directly inside `dir`
    pub size: u64,
    /// Names referenced directly from the primary source, in first-seen order
    pub dependencies: Vec<String>,
    /// Closure of `dependencies`, in discovery order
    pub transitive: Vec<String>,
    /// Route paths reaching this component directly or transitively
    pub usage: BTreeSet<String>,
    /// Components whose closure contains this one
    pub used_by: BTreeSet<String>,
    /// The source builds the multiplex handler
    pub multiplex_declared: bool,
    /// Inline multiplex declarations found in the source
    pub multiplex_entries: Vec<MultiplexEntry>,
    /// Set when two or more routes target a multiplex-declaring component
    pub is_multiplex_handler: bool,
    /// Route paths served through this handler
    pub multiplex_paths: Vec<String>,
}

impl ComponentRecord {
    pub fn new(name: &str, category: &str, kind: CategoryKind, dir: PathBuf, size: u64) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            kind,
            dir,
            size,
            dependencies: Vec::new(),
            transitive: Vec::new(),
            usage: BTreeSet::new(),
            used_by: BTreeSet::new(),
            multiplex_declared: false,
            multiplex_entries: Vec::new(),
            is_multiplex_handler: false,
            multiplex_paths: Vec::new(),
        }
    }

    /// Primary source file (`<dir>/<Name>.js`)
    pub fn source_path(&self) -> PathBuf {
        self.dir.join(format!("{}.js", self.name))
    }

    pub fn markup_path(&self) -> PathBuf {
        self.dir.join(format!("{}.html", self.name))
    }

    pub fn style_path(&self) -> PathBuf {
        self.dir.join(format!("{}.css", self.name))
    }

    pub fn declares_multiplex(&self) -> bool {
        self.multiplex_declared || !self.multiplex_entries.is_empty()
    }
}

/// All loaded components in discovery (registry) order with O(1) name lookup
#[derive(Debug, Clone, Default)]
pub struct Registry {
    components: Vec<ComponentRecord>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; a name that is already registered is ignored
    pub fn insert(&mut self, record: ComponentRecord) -> bool {
        if self.index.contains_key(&record.name) {
            return false;
        }
        self.index.insert(record.name.clone(), self.components.len());
        self.components.push(record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ComponentRecord> {
        self.index.get(name).map(|&i| &self.components[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ComponentRecord> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.components[i]),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Discovery position, used to break ties deterministically
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ComponentRecord> {
        self.components.iter_mut()
    }

    pub fn components(&self) -> &[ComponentRecord] {
        &self.components
    }

    pub fn names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SliceConfigFile {
    paths: SliceConfigPaths,
}

#[derive(Debug, Deserialize)]
struct SliceConfigPaths {
    components: HashMap<String, CategoryEntry>,
}

/// Directory (and optional kind) configured for a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Read `paths.components` from the project's category configuration.
/// A missing file is not an error; the default layout is used instead.
pub fn load_category_config(path: &Path) -> Result<HashMap<String, CategoryEntry>> {
    if !path.exists() {
        tracing::debug!(
            "No category config at {}, using default category directories",
            path.display()
        );
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    let parsed: SliceConfigFile =
        serde_json::from_str(&content).map_err(|e| BundlerError::CategoryConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(parsed.paths.components)
}

/// Extract the `name → category` entries of `const components = { ... }`
pub fn parse_registry_source(
    parser: &mut JsParser,
    source: &str,
    path: &Path,
) -> Result<Vec<(String, String)>> {
    let fail = |message: String| BundlerError::RegistryParse {
        path: path.to_path_buf(),
        message,
    };

    let doc = parser
        .parse(source)
        .ok_or_else(|| fail("parser produced no tree".to_string()))?;
    if doc.has_errors() {
        return Err(fail(doc.error_message()));
    }

    let mut object = None;
    doc.visit(|node| {
        if object.is_some() || node.kind() != "variable_declarator" {
            return;
        }
        let named_components = node
            .child_by_field_name("name")
            .map(|n| doc.text(n) == "components")
            .unwrap_or(false);
        if let (true, Some(value)) = (named_components, node.child_by_field_name("value")) {
            if value.kind() == "object" {
                object = Some(value);
            }
        }
    });
    let object =
        object.ok_or_else(|| fail("no `const components = { ... }` declaration".to_string()))?;

    for child in doc.named_children(object) {
        if child.kind() != "pair" && child.kind() != "comment" {
            return Err(fail(format!(
                "unsupported entry `{}` in components object",
                doc.text(child)
            )));
        }
    }

    let mut entries = Vec::new();
    for (name, value) in doc.object_pairs(object) {
        let category = doc
            .string_value(value)
            .ok_or_else(|| fail(format!("category of `{}` is not a string literal", name)))?;
        entries.push((name, category));
    }
    Ok(entries)
}

/// Sum of the sizes of the files directly inside `dir`
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Build the registry for a project
pub fn load_registry(
    layout: &ProjectLayout,
    parser: &mut JsParser,
) -> Result<(Registry, Vec<Warning>)> {
    let categories = load_category_config(&layout.slice_config)?;
    let source = std::fs::read_to_string(&layout.components_manifest)?;
    let entries = parse_registry_source(parser, &source, &layout.components_manifest)?;

    let default_base = layout.components_dir();
    let mut registry = Registry::new();
    let mut warnings = Vec::new();

    for (name, category) in entries {
        let (category_dir, kind) = match categories.get(&category) {
            Some(entry) => (
                layout.resolve_src_path(&entry.path),
                entry
                    .kind
                    .as_deref()
                    .map(CategoryKind::from_category)
                    .unwrap_or_else(|| CategoryKind::from_category(&category)),
            ),
            None => (default_base.join(&category), CategoryKind::from_category(&category)),
        };

        let dir = category_dir.join(&name);
        if !dir.is_dir() {
            warnings.push(Warning::emit(
                WarningKind::MissingComponentDir,
                Some(&name),
                format!("directory {} not found, component skipped", dir.display()),
            ));
            continue;
        }

        let size = directory_size(&dir);
        if !registry.insert(ComponentRecord::new(&name, &category, kind, dir, size)) {
            tracing::debug!("Component {} registered twice, keeping first entry", name);
        }
    }

    tracing::info!("Loaded {} components from registry", registry.len());
    Ok((registry, warnings))
}
