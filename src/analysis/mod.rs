//! Project Analysis
//!
//! Runs the read-only half of the pipeline: registry, source scanning, routes
//! and the dependency graph, then derives the aggregate metrics the strategy
//! selector works from.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::JsParser;
use crate::config::Config;
use crate::error::{Result, Warning};
use crate::graph::DependencyGraph;
use crate::project::ProjectLayout;
use crate::registry::{load_registry, Registry};
use crate::routes::{detect_multiplex_groups, load_routes, mark_route_targets, RouteGroup, RouteRecord};
use crate::scan::scan_components;

/// Component count and byte size of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: usize,
    pub size: u64,
}

/// Usage summary of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub name: String,
    pub routes: usize,
    pub size: u64,
}

/// Aggregate project metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_components: usize,
    pub total_routes: usize,
    /// Components reached by two or more routes
    pub shared_components: usize,
    /// `shared_components` as a percentage of all components, one decimal
    pub shared_percentage: f64,
    pub total_size: u64,
    pub average_size: u64,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub top_by_usage: Vec<UsageEntry>,
}

/// Everything the bundling stages need
#[derive(Debug, Clone)]
pub struct Analysis {
    pub registry: Registry,
    pub routes: Vec<RouteRecord>,
    pub graph: DependencyGraph,
    pub groups: Vec<RouteGroup>,
    pub metrics: Metrics,
    pub warnings: Vec<Warning>,
}

/// Runs the analysis stages for one project
pub struct Analyzer {
    config: Config,
    layout: ProjectLayout,
}

impl Analyzer {
    pub fn new<P: AsRef<Path>>(root: P, config: Config) -> Self {
        let layout = ProjectLayout::new(root, &config);
        Self { config, layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze the project. Only missing or malformed project files fail;
    /// component-level problems end up in `Analysis::warnings`.
    pub fn analyze(&self) -> Result<Analysis> {
        self.layout.validate()?;
        let mut parser = JsParser::new()?;
        let mut warnings = Vec::new();

        let (mut registry, registry_warnings) = load_registry(&self.layout, &mut parser)?;
        warnings.extend(registry_warnings);

        warnings.extend(scan_components(&mut registry, &self.config.scan)?);

        let (mut routes, route_warnings) = load_routes(&self.layout.routes, &mut parser)?;
        warnings.extend(route_warnings);
        warnings.extend(mark_route_targets(&mut registry, &routes));
        let mut groups = detect_multiplex_groups(&mut registry, &mut routes);

        let graph = DependencyGraph::build(&registry);
        graph.apply(&mut registry);
        graph.propagate_usage(&mut registry, &routes);
        for group in &mut groups {
            group.components = graph
                .unit(&group.key)
                .into_iter()
                .filter(|name| registry.contains(name))
                .collect();
        }

        let metrics = compute_metrics(&registry, &routes);
        tracing::info!(
            "Analysis complete: {} components, {} routes, {} shared",
            metrics.total_components,
            metrics.total_routes,
            metrics.shared_components
        );

        Ok(Analysis {
            registry,
            routes,
            graph,
            groups,
            metrics,
            warnings,
        })
    }
}

/// Derive aggregate metrics from a fully analyzed registry
pub fn compute_metrics(registry: &Registry, routes: &[RouteRecord]) -> Metrics {
    let total_components = registry.len();
    let shared_components = registry.iter().filter(|c| c.usage.len() >= 2).count();
    let total_size: u64 = registry.iter().map(|c| c.size).sum();

    let shared_percentage = if total_components == 0 {
        0.0
    } else {
        let pct = shared_components as f64 / total_components as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    };

    let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for component in registry.iter() {
        let stats = by_category.entry(component.category.clone()).or_default();
        stats.count += 1;
        stats.size += component.size;
    }

    let mut ranked: Vec<_> = registry.iter().collect();
    ranked.sort_by(|a, b| b.usage.len().cmp(&a.usage.len()));
    let top_by_usage = ranked
        .into_iter()
        .take(10)
        .map(|c| UsageEntry {
            name: c.name.clone(),
            routes: c.usage.len(),
            size: c.size,
        })
        .collect();

    Metrics {
        total_components,
        total_routes: routes.len(),
        shared_components,
        shared_percentage,
        total_size,
        average_size: if total_components == 0 {
            0
        } else {
            total_size / total_components as u64
        },
        by_category,
        top_by_usage,
    }
}

/// Format a byte count as kilobytes with one decimal
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Human-readable analysis report
pub fn render_report(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total components: {}", metrics.total_components);
    let _ = writeln!(out, "Total routes: {}", metrics.total_routes);
    let _ = writeln!(
        out,
        "Shared components: {} ({:.1}%)",
        metrics.shared_components, metrics.shared_percentage
    );
    let _ = writeln!(out, "Total size: {}", format_kb(metrics.total_size));
    let _ = writeln!(out, "Average size: {} per component", format_kb(metrics.average_size));

    let _ = writeln!(out, "\nBy category:");
    for (category, stats) in &metrics.by_category {
        let _ = writeln!(
            out,
            "  {}: {} components, {}",
            category,
            stats.count,
            format_kb(stats.size)
        );
    }

    let _ = writeln!(out, "\nTop {} most used components:", metrics.top_by_usage.len());
    for (i, entry) in metrics.top_by_usage.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} - {} routes - {}",
            i + 1,
            entry.name,
            entry.routes,
            format_kb(entry.size)
        );
    }
    out
}
