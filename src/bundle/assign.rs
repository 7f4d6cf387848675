//! Bundle Assigner
//!
//! Turns the analysed project into a [`BundlePlan`]. The global strategy puts
//! every reachable component into one bundle. The partitioned strategies build
//! the critical set first, then give each multiplex group, classifier bucket
//! (hybrid) or route (per-route) a secondary bundle holding whatever its
//! routes need beyond the critical set.
//!
//! A component lands in at most one secondary bundle: the first one that needs
//! it. Later bundles that also need it declare the owner as a dependency.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::classifier::RouteClassifier;
use super::critical::{build_critical_set, is_always_needed, CriticalSet};
use super::{route_slug, Bundle, BundleKind, KeyAllocator, Strategy, CRITICAL_KEY, GLOBAL_KEY};
use crate::analysis::Analysis;
use crate::config::{Config, UnreachablePolicy};
use crate::error::{Warning, WarningKind};

/// Which bundle serves a route, with the route's own footprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub path: String,
    pub component: String,
    pub bundle: String,
    /// Components the route needs (target plus closure)
    pub components: usize,
    pub size: u64,
}

/// Result of bundle assignment
#[derive(Debug, Clone, PartialEq)]
pub struct BundlePlan {
    pub strategy: Strategy,
    pub critical: Option<Bundle>,
    pub global: Option<Bundle>,
    pub secondary: Vec<Bundle>,
    /// Routes with a registered target, in manifest order
    pub routes: Vec<RouteAssignment>,
    /// Components that no route reaches and that are not loaded up front
    pub unreachable: Vec<String>,
    /// Critical candidates whose unit exceeded the budgets
    pub critical_skipped: Vec<String>,
}

impl BundlePlan {
    /// All bundles: critical, global, then secondary in creation order
    pub fn bundles(&self) -> Vec<&Bundle> {
        self.critical
            .iter()
            .chain(self.global.iter())
            .chain(self.secondary.iter())
            .collect()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles().len()
    }

    pub fn critical_size(&self) -> u64 {
        self.critical.as_ref().map(|b| b.size).unwrap_or(0)
    }

    pub fn bundle(&self, key: &str) -> Option<&Bundle> {
        self.bundles().into_iter().find(|b| b.key == key)
    }

    /// Bundles containing `component`
    pub fn bundles_of(&self, component: &str) -> Vec<&Bundle> {
        self.bundles()
            .into_iter()
            .filter(|b| b.components.iter().any(|c| c == component))
            .collect()
    }
}

/// Routes assigned together as one secondary bundle
struct AssignmentUnit {
    base_key: String,
    routes: Vec<(String, String)>,
}

impl AssignmentUnit {
    fn new(base_key: String) -> Self {
        Self {
            base_key,
            routes: Vec::new(),
        }
    }

    fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for (_, component) in &self.routes {
            if !targets.contains(component) {
                targets.push(component.clone());
            }
        }
        targets
    }
}

/// Registered members of the targets' units, in first-seen order
fn required_components(analysis: &Analysis, targets: &[String], exclude: &CriticalSet) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut required = Vec::new();
    for target in targets {
        for member in analysis.graph.unit(target) {
            if analysis.registry.contains(&member)
                && !exclude.contains(&member)
                && seen.insert(member.clone())
            {
                required.push(member);
            }
        }
    }
    required
}

fn total_size(analysis: &Analysis, components: &[String]) -> u64 {
    components
        .iter()
        .filter_map(|name| analysis.registry.get(name))
        .map(|c| c.size)
        .sum()
}

fn route_assignment(analysis: &Analysis, path: &str, component: &str, bundle: &str) -> RouteAssignment {
    let needed = required_components(analysis, &[component.to_string()], &CriticalSet::default());
    RouteAssignment {
        path: path.to_string(),
        component: component.to_string(),
        bundle: bundle.to_string(),
        components: needed.len(),
        size: total_size(analysis, &needed),
    }
}

/// Partition the analysed components into bundles
pub fn plan_bundles(
    analysis: &Analysis,
    strategy: Strategy,
    config: &Config,
    classifier: &dyn RouteClassifier,
) -> (BundlePlan, Vec<Warning>) {
    let plan = match strategy {
        Strategy::Global => plan_global(analysis, config),
        Strategy::Hybrid | Strategy::PerRoute => {
            plan_partitioned(analysis, strategy, config, classifier)
        }
    };

    let mut warnings = Vec::new();
    if config.unreachable == UnreachablePolicy::Warn {
        for name in &plan.unreachable {
            warnings.push(Warning::emit(
                WarningKind::Unreachable,
                Some(name),
                "not reachable from any route, excluded from every bundle",
            ));
        }
    } else if !plan.unreachable.is_empty() {
        tracing::debug!("Dropped {} unreachable components", plan.unreachable.len());
    }

    tracing::info!(
        "Planned {} bundles with the {} strategy",
        plan.bundle_count(),
        strategy
    );
    (plan, warnings)
}

fn plan_global(analysis: &Analysis, config: &Config) -> BundlePlan {
    let registry = &analysis.registry;
    let none = CriticalSet::default();
    let mut bundle = Bundle::new(GLOBAL_KEY, BundleKind::Global);
    let mut needed: HashSet<String> = HashSet::new();
    let mut routes = Vec::new();

    for route in analysis.routes.iter().filter(|r| registry.contains(&r.component)) {
        bundle.paths.push(route.path.clone());
        needed.extend(required_components(analysis, &[route.component.clone()], &none));
        routes.push(route_assignment(analysis, &route.path, &route.component, GLOBAL_KEY));
    }
    for record in registry.iter().filter(|r| is_always_needed(r, &config.critical)) {
        needed.extend(required_components(analysis, &[record.name.clone()], &none));
    }

    bundle.components = registry
        .iter()
        .filter(|c| needed.contains(&c.name))
        .map(|c| c.name.clone())
        .collect();
    bundle.size = total_size(analysis, &bundle.components);

    let unreachable = registry
        .iter()
        .filter(|c| !needed.contains(&c.name))
        .map(|c| c.name.clone())
        .collect();

    BundlePlan {
        strategy: Strategy::Global,
        critical: None,
        global: (!bundle.components.is_empty()).then_some(bundle),
        secondary: Vec::new(),
        routes,
        unreachable,
        critical_skipped: Vec::new(),
    }
}

fn plan_partitioned(
    analysis: &Analysis,
    strategy: Strategy,
    config: &Config,
    classifier: &dyn RouteClassifier,
) -> BundlePlan {
    let registry = &analysis.registry;
    let critical_set = build_critical_set(registry, &analysis.graph, &config.critical);

    let critical = if critical_set.is_empty() {
        None
    } else {
        let mut bundle = Bundle::new(CRITICAL_KEY, BundleKind::Critical);
        bundle.components = critical_set.components.clone();
        bundle.size = critical_set.size;
        Some(bundle)
    };

    let mut owner: HashMap<String, String> = critical_set
        .components
        .iter()
        .map(|name| (name.clone(), CRITICAL_KEY.to_string()))
        .collect();

    // Multiplex groups first, then the remaining routes
    let mut units: Vec<AssignmentUnit> = Vec::new();
    for group in &analysis.groups {
        let mut unit = AssignmentUnit::new(format!("multiroute-{}", route_slug(&group.key)));
        unit.routes = group
            .paths
            .iter()
            .map(|path| (path.clone(), group.key.clone()))
            .collect();
        units.push(unit);
    }

    let remaining = analysis
        .routes
        .iter()
        .filter(|r| r.group.is_none() && registry.contains(&r.component));
    match strategy {
        Strategy::Hybrid => {
            let mut buckets: HashMap<String, usize> = HashMap::new();
            for route in remaining {
                let bucket = classifier.classify(&route.path);
                let index = *buckets.entry(bucket.clone()).or_insert_with(|| {
                    units.push(AssignmentUnit::new(route_slug(&bucket)));
                    units.len() - 1
                });
                units[index]
                    .routes
                    .push((route.path.clone(), route.component.clone()));
            }
        }
        _ => {
            for route in remaining {
                let mut unit = AssignmentUnit::new(route_slug(&route.path));
                unit.routes.push((route.path.clone(), route.component.clone()));
                units.push(unit);
            }
        }
    }

    let mut keys = KeyAllocator::new();
    let mut secondary = Vec::new();
    let mut served: HashMap<String, String> = HashMap::new();

    for unit in units {
        let required = required_components(analysis, &unit.targets(), &critical_set);
        let owned: Vec<String> = required
            .iter()
            .filter(|c| !owner.contains_key(*c))
            .cloned()
            .collect();

        if owned.is_empty() {
            // Already covered by critical or earlier bundles
            for (path, component) in &unit.routes {
                let key = owner
                    .get(component)
                    .cloned()
                    .unwrap_or_else(|| CRITICAL_KEY.to_string());
                served.insert(path.clone(), key);
            }
            continue;
        }

        let key = keys.allocate(&unit.base_key);
        let mut bundle = Bundle::new(&key, BundleKind::Secondary);
        if critical.is_some() {
            bundle.dependencies.push(CRITICAL_KEY.to_string());
        }
        for component in &required {
            if let Some(existing) = owner.get(component) {
                if !bundle.dependencies.contains(existing) {
                    bundle.dependencies.push(existing.clone());
                }
            }
        }
        for component in &owned {
            owner.insert(component.clone(), key.clone());
        }
        bundle.paths = unit.routes.iter().map(|(path, _)| path.clone()).collect();
        bundle.size = total_size(analysis, &owned);
        bundle.components = owned;
        for (path, _) in &unit.routes {
            served.insert(path.clone(), key.clone());
        }
        secondary.push(bundle);
    }

    let routes = analysis
        .routes
        .iter()
        .filter_map(|route| {
            served
                .get(&route.path)
                .map(|key| route_assignment(analysis, &route.path, &route.component, key))
        })
        .collect();

    let unreachable = registry
        .iter()
        .filter(|c| c.usage.is_empty() && !critical_set.contains(&c.name))
        .map(|c| c.name.clone())
        .collect();

    BundlePlan {
        strategy,
        critical,
        global: None,
        secondary,
        routes,
        unreachable,
        critical_skipped: critical_set.skipped,
    }
}
