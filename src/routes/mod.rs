//! Route Loader
//!
//! Reads the route manifest (`routes.js`) into ordered [`RouteRecord`]s, marks
//! each target component with the route path, and coalesces routes served by
//! one multiplex handler into a [`RouteGroup`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::JsParser;
use crate::error::{BundlerError, Result, Warning, WarningKind};
use crate::registry::Registry;

/// One navigable path and the component that renders it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub path: String,
    pub component: String,
    /// Multiplex group key when the route is served by a handler group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl RouteRecord {
    pub fn new(path: &str, component: &str) -> Self {
        Self {
            path: path.to_string(),
            component: component.to_string(),
            group: None,
        }
    }
}

/// How a route group was formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Routes that all target the same multiplex handler
    Multiplex,
    /// Routes sharing a classifier bucket
    Categorical,
}

/// Routes bundled together as one assignment unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteGroup {
    /// Handler name for multiplex groups, bucket name for categorical ones
    pub key: String,
    pub kind: GroupKind,
    pub paths: Vec<String>,
    /// Member components in discovery order
    pub components: Vec<String>,
}

/// Parse every object literal carrying string `path` and `component`
/// properties, in document order. Duplicate paths keep their first position
/// and take the last target.
pub fn parse_routes_source(
    parser: &mut JsParser,
    source: &str,
    path: &Path,
) -> Result<(Vec<RouteRecord>, Vec<Warning>)> {
    let fail = |message: String| BundlerError::RouteParse {
        path: path.to_path_buf(),
        message,
    };
    let doc = parser
        .parse(source)
        .ok_or_else(|| fail("parser produced no tree".to_string()))?;
    if doc.has_errors() {
        return Err(fail(doc.error_message()));
    }

    let mut found = Vec::new();
    doc.visit(|node| {
        if node.kind() != "object" {
            return;
        }
        let route_path = doc.string_property(node, "path");
        let component = doc.string_property(node, "component");
        if let (Some(route_path), Some(component)) = (route_path, component) {
            found.push(RouteRecord::new(&route_path, &component));
        }
    });

    let mut routes: Vec<RouteRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();
    for route in found {
        match positions.get(&route.path) {
            Some(&i) => {
                warnings.push(Warning::emit(
                    WarningKind::DuplicateRoute,
                    Some(&route.component),
                    format!(
                        "route {} declared more than once, {} replaces {}",
                        route.path, route.component, routes[i].component
                    ),
                ));
                routes[i].component = route.component;
            }
            None => {
                positions.insert(route.path.clone(), routes.len());
                routes.push(route);
            }
        }
    }
    Ok((routes, warnings))
}

/// Read and parse the route manifest
pub fn load_routes(path: &Path, parser: &mut JsParser) -> Result<(Vec<RouteRecord>, Vec<Warning>)> {
    if !path.is_file() {
        return Err(BundlerError::MissingProjectFile(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)?;
    let (routes, warnings) = parse_routes_source(parser, &source, path)?;
    tracing::info!("Loaded {} routes from {}", routes.len(), path.display());
    Ok((routes, warnings))
}

/// Record every route path on its target component. Targets that are not
/// registered produce a warning.
pub fn mark_route_targets(registry: &mut Registry, routes: &[RouteRecord]) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for route in routes {
        match registry.get_mut(&route.component) {
            Some(record) => {
                record.usage.insert(route.path.clone());
            }
            None => warnings.push(Warning::emit(
                WarningKind::UnknownRouteTarget,
                Some(&route.component),
                format!("route {} targets a component that is not registered", route.path),
            )),
        }
    }
    warnings
}

/// Coalesce routes into multiplex groups. A component that declares a
/// multiplex and is the target of two or more distinct paths becomes a
/// handler; its routes are tagged with the handler's name. Member components
/// are filled in once closures are known.
pub fn detect_multiplex_groups(
    registry: &mut Registry,
    routes: &mut [RouteRecord],
) -> Vec<RouteGroup> {
    let mut groups = Vec::new();
    for name in registry.names() {
        let declares = registry
            .get(&name)
            .map(|c| c.declares_multiplex())
            .unwrap_or(false);
        if !declares {
            continue;
        }

        let paths: Vec<String> = routes
            .iter()
            .filter(|r| r.component == name)
            .map(|r| r.path.clone())
            .collect();
        if paths.len() < 2 {
            continue;
        }

        for route in routes.iter_mut().filter(|r| r.component == name) {
            route.group = Some(name.clone());
        }
        if let Some(record) = registry.get_mut(&name) {
            record.is_multiplex_handler = true;
            record.multiplex_paths = paths.clone();
        }
        tracing::debug!("Multiplex group {} covers {} routes", name, paths.len());
        groups.push(RouteGroup {
            key: name,
            kind: GroupKind::Multiplex,
            paths,
            components: Vec::new(),
        });
    }
    groups
}
