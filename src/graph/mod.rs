//! Dependency Graph
//!
//! Directed graph over components built from their direct references.
//! Closures are computed by depth-first traversal with a visited set, so
//! cyclic references terminate instead of recursing forever; a component is
//! part of its own closure only when a cycle leads back to it.

use std::collections::{HashMap, HashSet};

use crate::registry::Registry;
use crate::routes::RouteRecord;

/// Direct and transitive dependencies per component
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    direct: HashMap<String, Vec<String>>,
    transitive: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build from the registry's scanned dependencies and compute every closure
    pub fn build(registry: &Registry) -> Self {
        let direct: HashMap<String, Vec<String>> = registry
            .iter()
            .map(|c| (c.name.clone(), c.dependencies.clone()))
            .collect();
        let transitive = registry
            .iter()
            .map(|c| (c.name.clone(), closure_of(&direct, &c.name)))
            .collect();
        Self { direct, transitive }
    }

    pub fn direct(&self, name: &str) -> &[String] {
        self.direct.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn transitive(&self, name: &str) -> &[String] {
        self.transitive.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The component followed by its closure, without repeats
    pub fn unit(&self, name: &str) -> Vec<String> {
        let mut unit = vec![name.to_string()];
        unit.extend(self.transitive(name).iter().filter(|dep| *dep != name).cloned());
        unit
    }

    /// Store closures on the records and invert them into `used_by`
    pub fn apply(&self, registry: &mut Registry) {
        for record in registry.iter_mut() {
            record.transitive = self.transitive(&record.name).to_vec();
            record.used_by.clear();
        }
        for name in registry.names() {
            for dep in self.transitive(&name) {
                if dep == &name {
                    continue;
                }
                if let Some(record) = registry.get_mut(dep) {
                    record.used_by.insert(name.clone());
                }
            }
        }
    }

    /// Add each route path to the usage set of everything its target reaches
    pub fn propagate_usage(&self, registry: &mut Registry, routes: &[RouteRecord]) {
        for route in routes {
            if !registry.contains(&route.component) {
                continue;
            }
            for member in self.unit(&route.component) {
                if let Some(record) = registry.get_mut(&member) {
                    record.usage.insert(route.path.clone());
                }
            }
        }
    }
}

/// Pre-order DFS closure of `start` over `direct`. Unregistered names are
/// kept as leaves.
fn closure_of(direct: &HashMap<String, Vec<String>>, start: &str) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut closure = Vec::new();
    let mut stack: Vec<&str> = direct
        .get(start)
        .map(|deps| deps.iter().rev().map(String::as_str).collect())
        .unwrap_or_default();

    while let Some(name) = stack.pop() {
        if !visited.insert(name) {
            continue;
        }
        closure.push(name.to_string());
        if let Some(deps) = direct.get(name) {
            stack.extend(
                deps.iter()
                    .rev()
                    .map(String::as_str)
                    .filter(|dep| !visited.contains(dep)),
            );
        }
    }
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CategoryKind, ComponentRecord};
    use std::path::PathBuf;

    fn registry(edges: &[(&str, &[&str])]) -> Registry {
        let mut registry = Registry::new();
        for (name, deps) in edges {
            let mut record =
                ComponentRecord::new(name, "Visual", CategoryKind::Visual, PathBuf::from(name), 100);
            record.dependencies = deps.iter().map(|d| d.to_string()).collect();
            registry.insert(record);
        }
        registry
    }

    #[test]
    fn test_acyclic_closure_is_preorder() {
        let reg = registry(&[
            ("A", &["B", "C"]),
            ("B", &["D"]),
            ("C", &["D", "E"]),
            ("D", &[]),
            ("E", &[]),
        ]);
        let graph = DependencyGraph::build(&reg);
        assert_eq!(graph.transitive("A"), &["B", "D", "C", "E"]);
        assert_eq!(graph.transitive("D"), &[] as &[String]);
        assert_eq!(graph.unit("C"), vec!["C", "D", "E"]);
    }

    #[test]
    fn test_direct_is_subset_of_transitive() {
        let reg = registry(&[
            ("A", &["B", "Unregistered"]),
            ("B", &["C"]),
            ("C", &["A"]),
        ]);
        let graph = DependencyGraph::build(&reg);
        for name in ["A", "B", "C"] {
            for dep in graph.direct(name) {
                assert!(graph.transitive(name).contains(dep), "{} missing {}", name, dep);
            }
        }
    }

    #[test]
    fn test_cycle_terminates_and_includes_self() {
        let reg = registry(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"]), ("Solo", &["Solo"])]);
        let graph = DependencyGraph::build(&reg);
        assert_eq!(graph.transitive("A"), &["B", "C", "A"]);
        assert_eq!(graph.transitive("Solo"), &["Solo"]);
        assert_eq!(graph.unit("A"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_used_by_and_usage() {
        let mut reg = registry(&[("A", &["D"]), ("B", &["D"]), ("C", &[]), ("D", &[]), ("E", &[])]);
        let graph = DependencyGraph::build(&reg);
        graph.apply(&mut reg);
        let routes = vec![
            RouteRecord::new("/r1", "A"),
            RouteRecord::new("/r2", "B"),
            RouteRecord::new("/r3", "C"),
        ];
        graph.propagate_usage(&mut reg, &routes);

        let d = reg.get("D").unwrap();
        assert_eq!(d.used_by.iter().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(d.usage.iter().collect::<Vec<_>>(), vec!["/r1", "/r2"]);
        assert!(reg.get("E").unwrap().usage.is_empty());
    }
}
