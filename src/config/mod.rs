//! Configuration
//!
//! Project configuration loading and defaults. Every field has a default so an
//! absent or partial `.slice-bundle.json` is always valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bundle::Strategy;
use crate::error::{BundlerError, Result};

/// Default config file name, looked up in the project root
pub const CONFIG_FILE: &str = ".slice-bundle.json";

/// Main bundler configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Project file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Strategy selection thresholds
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Critical bundle budgets and candidate rules
    #[serde(default)]
    pub critical: CriticalConfig,

    /// Source scanning settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Route bucket rules for the hybrid strategy
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// What happens to components no route reaches
    #[serde(default)]
    pub unreachable: UnreachablePolicy,

    /// Runtime capability emitted artifacts register with
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Manifest file names
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `<root>/.slice-bundle.json`, falling back to defaults when absent
    pub fn load_from_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the budgets or thresholds meaningless
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.strategy.global_shared_percentage) {
            return Err(BundlerError::Config(format!(
                "strategy.globalSharedPercentage must be within 0..=100, got {}",
                self.strategy.global_shared_percentage
            )));
        }
        if self.strategy.hybrid_max_components < self.strategy.global_max_components {
            return Err(BundlerError::Config(
                "strategy.hybridMaxComponents must not be below globalMaxComponents".to_string(),
            ));
        }
        if self.scan.build_callee.trim().is_empty() {
            return Err(BundlerError::Config("scan.buildCallee must not be empty".to_string()));
        }
        if self.classifier.fallback.trim().is_empty() {
            return Err(BundlerError::Config("classifier.fallback must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locations of the project inputs and outputs, relative to the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    /// Application source directory
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Component registry, relative to `src`
    #[serde(default = "default_components_manifest")]
    pub components_manifest: PathBuf,
    /// Category → directory configuration, relative to `src`
    #[serde(default = "default_slice_config")]
    pub slice_config: PathBuf,
    /// Route manifest, relative to `src`
    #[serde(default = "default_routes")]
    pub routes: PathBuf,
    /// Bundle output directory, relative to `src`
    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            components_manifest: default_components_manifest(),
            slice_config: default_slice_config(),
            routes: default_routes(),
            output: default_output_dir(),
        }
    }
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_components_manifest() -> PathBuf {
    PathBuf::from("Components/components.js")
}

fn default_slice_config() -> PathBuf {
    PathBuf::from("sliceConfig.json")
}

fn default_routes() -> PathBuf {
    PathBuf::from("routes.js")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundles")
}

/// Requested partition strategy
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyMode {
    /// Derive the strategy from project metrics
    #[default]
    Auto,
    Global,
    Hybrid,
    PerRoute,
}

impl StrategyMode {
    /// The forced strategy, if any
    pub fn forced(&self) -> Option<Strategy> {
        match self {
            StrategyMode::Auto => None,
            StrategyMode::Global => Some(Strategy::Global),
            StrategyMode::Hybrid => Some(Strategy::Hybrid),
            StrategyMode::PerRoute => Some(Strategy::PerRoute),
        }
    }
}

/// Thresholds driving automatic strategy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    #[serde(default)]
    pub mode: StrategyMode,
    /// Projects with fewer components than this use one global bundle
    #[serde(default = "default_global_max_components")]
    pub global_max_components: usize,
    /// Sharing above this percentage also selects the global bundle
    #[serde(default = "default_global_shared_percentage")]
    pub global_shared_percentage: f64,
    /// Projects with fewer components than this use the hybrid strategy
    #[serde(default = "default_hybrid_max_components")]
    pub hybrid_max_components: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Auto,
            global_max_components: default_global_max_components(),
            global_shared_percentage: default_global_shared_percentage(),
            hybrid_max_components: default_hybrid_max_components(),
        }
    }
}

fn default_global_max_components() -> usize {
    20
}

fn default_global_shared_percentage() -> f64 {
    60.0
}

fn default_hybrid_max_components() -> usize {
    100
}

/// Critical (always-loaded) bundle budgets and candidate rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalConfig {
    /// Maximum total byte size of the critical bundle
    #[serde(default = "default_max_critical_size")]
    pub max_size: u64,
    /// Maximum number of components in the critical bundle
    #[serde(default = "default_max_critical_components")]
    pub max_components: usize,
    /// Routes needed before a component counts as shared
    #[serde(default = "default_min_shared_usage")]
    pub min_shared_usage: usize,
    /// Components below this byte size count as small
    #[serde(default = "default_small_size")]
    pub small_size: u64,
    /// Routes a small component needs to become a candidate
    #[serde(default = "default_small_min_usage")]
    pub small_min_usage: usize,
    /// Weight of one route of usage in the priority score
    #[serde(default = "default_usage_weight")]
    pub usage_weight: f64,
    /// Components that are always needed regardless of category
    #[serde(default = "default_always_include")]
    pub always_include: Vec<String>,
}

impl Default for CriticalConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_critical_size(),
            max_components: default_max_critical_components(),
            min_shared_usage: default_min_shared_usage(),
            small_size: default_small_size(),
            small_min_usage: default_small_min_usage(),
            usage_weight: default_usage_weight(),
            always_include: default_always_include(),
        }
    }
}

fn default_max_critical_size() -> u64 {
    50 * 1024
}

fn default_max_critical_components() -> usize {
    15
}

fn default_min_shared_usage() -> usize {
    3
}

fn default_small_size() -> u64 {
    2000
}

fn default_small_min_usage() -> usize {
    3
}

fn default_usage_weight() -> f64 {
    10.0
}

fn default_always_include() -> Vec<String> {
    vec!["Navbar".to_string(), "Footer".to_string(), "Layout".to_string()]
}

/// Source scanning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Generic component-instantiation call
    #[serde(default = "default_build_callee")]
    pub build_callee: String,
    /// Name of the framework's multi-route handler component
    #[serde(default = "default_multiplex_handler")]
    pub multiplex_handler: String,
    /// Worker threads for scanning and emission (rayon default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            build_callee: default_build_callee(),
            multiplex_handler: default_multiplex_handler(),
            workers: None,
        }
    }
}

fn default_build_callee() -> String {
    "slice.build".to_string()
}

fn default_multiplex_handler() -> String {
    "MultiRoute".to_string()
}

/// One keyword rule of the route classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub bucket: String,
    /// Lowercased paths that match exactly
    #[serde(default)]
    pub exact: Vec<String>,
    /// Substrings of the lowercased path
    #[serde(default)]
    pub contains: Vec<String>,
}

impl ClassifierRule {
    fn new(bucket: &str, exact: &[&str], contains: &[&str]) -> Self {
        Self {
            bucket: bucket.to_string(),
            exact: exact.iter().map(|s| s.to_string()).collect(),
            contains: contains.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered keyword rules; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<ClassifierRule>,
    #[serde(default = "default_fallback_bucket")]
    pub fallback: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fallback: default_fallback_bucket(),
        }
    }
}

fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new("home", &["/", "/home"], &[]),
        ClassifierRule::new("documentation", &[], &["docum"]),
        ClassifierRule::new(
            "components",
            &[],
            &[
                "component", "visual", "card", "button", "input", "switch", "checkbox", "select",
                "details", "grid", "loading", "layout", "navbar", "treeview", "multiroute",
            ],
        ),
        ClassifierRule::new("configuration", &[], &["theme", "slice", "config"]),
        ClassifierRule::new("routing", &[], &["routing", "guard"]),
        ClassifierRule::new("services", &[], &["service", "command"]),
        ClassifierRule::new("advanced", &[], &["structural", "lifecycle", "static", "build"]),
        ClassifierRule::new("tools", &[], &["playground", "creator"]),
        ClassifierRule::new("misc", &[], &["about", "404"]),
    ]
}

fn default_fallback_bucket() -> String {
    "general".to_string()
}

/// Treatment of components that no route reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreachablePolicy {
    /// Exclude them and report each one as a warning
    #[default]
    Warn,
    /// Exclude them silently (dead-code elimination)
    Drop,
}

/// Capability emitted artifacts call into when loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Dotted path of the registrar object below `window`
    #[serde(default = "default_registrar")]
    pub registrar: String,
    /// Method invoked with the bundle payload
    #[serde(default = "default_register_method")]
    pub register_method: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registrar: default_registrar(),
            register_method: default_register_method(),
        }
    }
}

fn default_registrar() -> String {
    "slice.controller".to_string()
}

fn default_register_method() -> String {
    "registerBundle".to_string()
}

/// Manifest output file names, placed in the bundle output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default = "default_manifest_file")]
    pub manifest: String,
    #[serde(default = "default_companion_file")]
    pub companion: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest_file(),
            companion: default_companion_file(),
        }
    }
}

fn default_manifest_file() -> String {
    "bundle.config.json".to_string()
}

fn default_companion_file() -> String {
    "bundle.config.js".to_string()
}
