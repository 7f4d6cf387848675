//! Critical-Set Builder
//!
//! Greedy, budget-bounded selection of the components loaded up front.
//! Candidates are ranked by `usage * weight - size_kb`; each candidate is
//! admitted together with its closure as one atomic unit, or not at all.
//! The result is deterministic but not optimal.

use std::collections::HashSet;

use crate::config::CriticalConfig;
use crate::graph::DependencyGraph;
use crate::registry::{CategoryKind, ComponentRecord, Registry};

/// Components admitted to the critical bundle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriticalSet {
    /// Admitted components in admission order
    pub components: Vec<String>,
    pub size: u64,
    /// Candidates whose unit did not fit the budgets
    pub skipped: Vec<String>,
}

impl CriticalSet {
    pub fn contains(&self, name: &str) -> bool {
        self.components.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Structural components and configured always-include names
pub fn is_always_needed(record: &ComponentRecord, config: &CriticalConfig) -> bool {
    record.kind == CategoryKind::Structural || config.always_include.contains(&record.name)
}

/// Shared widely enough, always needed, or small and used by a few routes
pub fn is_candidate(record: &ComponentRecord, config: &CriticalConfig) -> bool {
    let usage = record.usage.len();
    usage >= config.min_shared_usage
        || is_always_needed(record, config)
        || (record.size < config.small_size && usage >= config.small_min_usage)
}

pub fn priority(record: &ComponentRecord, config: &CriticalConfig) -> f64 {
    record.usage.len() as f64 * config.usage_weight - record.size as f64 / 1024.0
}

/// Rank the candidates and admit whole units while both budgets hold
pub fn build_critical_set(
    registry: &Registry,
    graph: &DependencyGraph,
    config: &CriticalConfig,
) -> CriticalSet {
    let mut ranked: Vec<(&ComponentRecord, f64)> = registry
        .iter()
        .filter(|record| is_candidate(record, config))
        .map(|record| (record, priority(record, config)))
        .collect();
    // Stable sort keeps discovery order among equal scores
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut set = CriticalSet::default();
    let mut admitted: HashSet<String> = HashSet::new();

    for (candidate, score) in ranked {
        if admitted.contains(&candidate.name) {
            continue;
        }
        let unit: Vec<&ComponentRecord> = graph
            .unit(&candidate.name)
            .iter()
            .filter(|name| !admitted.contains(*name))
            .filter_map(|name| registry.get(name))
            .collect();
        let unit_size: u64 = unit.iter().map(|c| c.size).sum();

        if set.size + unit_size > config.max_size
            || set.components.len() + unit.len() > config.max_components
        {
            tracing::debug!(
                "Critical candidate {} (priority {:.1}) skipped: unit of {} components, {} bytes",
                candidate.name,
                score,
                unit.len(),
                unit_size
            );
            set.skipped.push(candidate.name.clone());
            continue;
        }

        for member in unit {
            admitted.insert(member.name.clone());
            set.components.push(member.name.clone());
        }
        set.size += unit_size;
    }

    tracing::info!(
        "Critical set: {} components, {} bytes, {} candidates skipped",
        set.components.len(),
        set.size,
        set.skipped.len()
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(name: &str, kind: CategoryKind, size: u64, routes: usize, deps: &[&str]) -> ComponentRecord {
        let mut record = ComponentRecord::new(name, kind.as_str(), kind, PathBuf::from(name), size);
        record.usage = (0..routes).map(|i| format!("/r{}", i)).collect();
        record.dependencies = deps.iter().map(|d| d.to_string()).collect();
        record
    }

    fn build(records: Vec<ComponentRecord>, config: &CriticalConfig) -> CriticalSet {
        let mut registry = Registry::new();
        for r in records {
            registry.insert(r);
        }
        let graph = DependencyGraph::build(&registry);
        build_critical_set(&registry, &graph, config)
    }

    #[test]
    fn test_candidate_rules() {
        let config = CriticalConfig::default();
        assert!(is_candidate(&record("Shared", CategoryKind::Visual, 9000, 3, &[]), &config));
        assert!(is_candidate(&record("Logger", CategoryKind::Structural, 9000, 0, &[]), &config));
        assert!(is_candidate(&record("Navbar", CategoryKind::Visual, 9000, 0, &[]), &config));
        assert!(!is_candidate(&record("Page", CategoryKind::Visual, 500, 1, &[]), &config));
    }

    #[test]
    fn test_priority_prefers_usage_then_small_size() {
        let config = CriticalConfig::default();
        let a = record("A", CategoryKind::Visual, 2048, 4, &[]);
        let b = record("B", CategoryKind::Visual, 1024, 4, &[]);
        assert_eq!(priority(&a, &config), 38.0);
        assert!(priority(&b, &config) > priority(&a, &config));
    }

    #[test]
    fn test_second_unit_over_budget_is_skipped_whole() {
        let config = CriticalConfig {
            max_size: 10 * 1024,
            ..CriticalConfig::default()
        };
        let set = build(
            vec![
                record("P", CategoryKind::Visual, 3 * 1024, 4, &["PDep"]),
                record("PDep", CategoryKind::Visual, 3 * 1024, 0, &[]),
                record("Q", CategoryKind::Visual, 3 * 1024, 3, &["QDep"]),
                record("QDep", CategoryKind::Visual, 3 * 1024, 0, &[]),
            ],
            &config,
        );
        assert_eq!(set.components, vec!["P", "PDep"]);
        assert_eq!(set.size, 6 * 1024);
        assert_eq!(set.skipped, vec!["Q"]);
        assert!(!set.contains("QDep"));
    }

    #[test]
    fn test_budgets_hold_for_many_candidates() {
        let config = CriticalConfig {
            max_size: 8000,
            max_components: 4,
            ..CriticalConfig::default()
        };
        let records = (0..12)
            .map(|i| record(&format!("C{}", i), CategoryKind::Visual, 900 + i * 250, 3 + i as usize % 4, &[]))
            .collect();
        let set = build(records, &config);
        assert!(set.size <= config.max_size);
        assert!(set.len() <= config.max_components);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_zero_count_budget_admits_nothing() {
        let config = CriticalConfig {
            max_components: 0,
            ..CriticalConfig::default()
        };
        let set = build(
            vec![
                record("Navbar", CategoryKind::Structural, 512, 5, &[]),
                record("Card", CategoryKind::Visual, 512, 5, &[]),
            ],
            &config,
        );
        assert!(set.is_empty());
        assert_eq!(set.size, 0);
        assert_eq!(set.skipped, vec!["Navbar", "Card"]);
    }

    #[test]
    fn test_ties_follow_discovery_order() {
        let config = CriticalConfig {
            max_components: 1,
            ..CriticalConfig::default()
        };
        let set = build(
            vec![
                record("First", CategoryKind::Visual, 1024, 3, &[]),
                record("Second", CategoryKind::Visual, 1024, 3, &[]),
            ],
            &config,
        );
        assert_eq!(set.components, vec!["First"]);
        assert_eq!(set.skipped, vec!["Second"]);
    }

    #[test]
    fn test_unit_counts_only_unadmitted_members() {
        let set = build(
            vec![
                record("Shell", CategoryKind::Structural, 100, 5, &["Icon"]),
                record("Icon", CategoryKind::Visual, 100, 5, &[]),
                record("Menu", CategoryKind::Visual, 100, 4, &["Icon"]),
            ],
            &CriticalConfig::default(),
        );
        assert_eq!(set.components, vec!["Shell", "Icon", "Menu"]);
        assert_eq!(set.size, 300);
    }
}
