//! Bundles
//!
//! Strategy selection, critical-set construction, assignment of components to
//! bundles and emission of the bundle artifacts.

pub mod assign;
pub mod classifier;
pub mod critical;
pub mod emit;
pub mod strategy;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use assign::{plan_bundles, BundlePlan, RouteAssignment};
pub use classifier::{KeywordClassifier, RouteClassifier};
pub use critical::{build_critical_set, CriticalSet};
pub use emit::{write_artifacts, BundleEmitter, RenderedBundle};
pub use strategy::{resolve_strategy, select_strategy};

/// Key of the always-loaded bundle
pub const CRITICAL_KEY: &str = "critical";

/// Key of the single bundle produced by the global strategy
pub const GLOBAL_KEY: &str = "global";

/// How components are partitioned into bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Everything in one artifact
    Global,
    /// Critical set plus a few categorical bundles
    Hybrid,
    /// Critical set plus one bundle per route or route group
    PerRoute,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Global => "global",
            Strategy::Hybrid => "hybrid",
            Strategy::PerRoute => "per-route",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition a bundle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    Critical,
    Secondary,
    Global,
}

impl BundleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleKind::Critical => "critical",
            BundleKind::Secondary => "secondary",
            BundleKind::Global => "global",
        }
    }
}

/// A named group of components emitted as one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub key: String,
    pub kind: BundleKind,
    /// Route paths this bundle serves
    pub paths: Vec<String>,
    /// Member components in insertion order
    pub components: Vec<String>,
    /// Sum of the member component sizes
    pub size: u64,
    /// Keys of bundles that must be loaded first
    pub dependencies: Vec<String>,
}

impl Bundle {
    pub fn new(key: &str, kind: BundleKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
            paths: Vec::new(),
            components: Vec::new(),
            size: 0,
            dependencies: Vec::new(),
        }
    }

    /// Artifact file name, e.g. `slice-bundle.critical.js`
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.key)
    }
}

pub fn artifact_file_name(key: &str) -> String {
    format!("slice-bundle.{}.js", key)
}

/// File-name-safe form of a route path: `/` is `home`, separators become
/// dashes and anything outside `[a-z0-9-]` is dropped.
pub fn route_slug(path: &str) -> String {
    if path == "/" {
        return "home".to_string();
    }
    let slug: String = path
        .trim_start_matches('/')
        .replace('/', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .trim_matches('-')
        .to_lowercase();
    if slug.is_empty() {
        "route".to_string()
    } else {
        slug
    }
}

/// Hands out unique bundle keys. The critical and global keys are reserved.
#[derive(Debug)]
pub struct KeyAllocator {
    used: HashSet<String>,
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self {
            used: [CRITICAL_KEY, GLOBAL_KEY].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base`, or `base-2`, `base-3`, ... when already taken
    pub fn allocate(&mut self, base: &str) -> String {
        let mut key = base.to_string();
        let mut n = 2;
        while self.used.contains(&key) {
            key = format!("{}-{}", base, n);
            n += 1;
        }
        self.used.insert(key.clone());
        key
    }
}
