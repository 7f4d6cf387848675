//! Source Scanner
//!
//! Extracts the components a component's primary source refers to:
//! `slice.build('X', ...)` calls, multiplex declarations
//! (`slice.build('MultiRoute', { routes: [...] })`) and imports from the
//! components tree. Scanning is isolated per component: a file that cannot be
//! read or parsed yields a warning and an empty dependency set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tree_sitter::Node;

use crate::ast::{JsDocument, JsParser};
use crate::config::ScanConfig;
use crate::error::{BundlerError, Result, Warning, WarningKind};
use crate::registry::{MultiplexEntry, Registry};
use crate::workers::run_with_workers;

/// Dependencies found in one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Referenced component names, deduplicated in first-seen order
    pub dependencies: Vec<String>,
    /// Set whenever the source builds the multiplex handler
    pub declares_multiplex: bool,
    /// Inline `path → component` entries whose values are plain strings
    pub multiplex: Vec<MultiplexEntry>,
}

impl ScanOutcome {
    fn add_dependency(&mut self, seen: &mut HashSet<String>, name: &str) {
        if !name.is_empty() && seen.insert(name.to_string()) {
            self.dependencies.push(name.to_string());
        }
    }
}

/// Recognises component-instantiation calls in a parsed source
#[derive(Debug, Clone)]
pub struct DependencyExtractor {
    /// Object of the build call (`slice`), empty for a bare function
    callee_object: String,
    /// Method or function name (`build`)
    callee_method: String,
    multiplex_handler: String,
}

impl DependencyExtractor {
    pub fn new(build_callee: &str, multiplex_handler: &str) -> Self {
        let (object, method) = match build_callee.rsplit_once('.') {
            Some((object, method)) => (object.to_string(), method.to_string()),
            None => (String::new(), build_callee.to_string()),
        };
        Self {
            callee_object: object,
            callee_method: method,
            multiplex_handler: multiplex_handler.to_string(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.build_callee, &config.multiplex_handler)
    }

    /// Parse `source` and collect its references. `Err` carries a message for
    /// the parse-failure warning.
    pub fn extract(
        &self,
        parser: &mut JsParser,
        source: &str,
    ) -> std::result::Result<ScanOutcome, String> {
        let doc = parser
            .parse(source)
            .ok_or_else(|| "parser produced no tree".to_string())?;
        if doc.has_errors() {
            return Err(doc.error_message());
        }

        let mut outcome = ScanOutcome::default();
        let mut seen = HashSet::new();
        doc.visit(|node| match node.kind() {
            "call_expression" => self.visit_call(&doc, node, &mut outcome, &mut seen),
            "import_statement" => {
                if let Some(name) = component_import(&doc, node) {
                    outcome.add_dependency(&mut seen, &name);
                }
            }
            _ => {}
        });
        Ok(outcome)
    }

    fn is_build_call(&self, doc: &JsDocument<'_>, function: Node<'_>) -> bool {
        if self.callee_object.is_empty() {
            return function.kind() == "identifier" && doc.text(function) == self.callee_method;
        }
        if function.kind() != "member_expression" {
            return false;
        }
        let (Some(object), Some(property)) = (
            function.child_by_field_name("object"),
            function.child_by_field_name("property"),
        ) else {
            return false;
        };
        let object_text = doc.text(object);
        doc.text(property) == self.callee_method
            && (object_text == self.callee_object
                || object_text.strip_prefix("window.") == Some(self.callee_object.as_str()))
    }

    fn visit_call(
        &self,
        doc: &JsDocument<'_>,
        call: Node<'_>,
        outcome: &mut ScanOutcome,
        seen: &mut HashSet<String>,
    ) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        if !self.is_build_call(doc, function) {
            return;
        }
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        let args: Vec<Node<'_>> = doc
            .named_children(arguments)
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .collect();
        let Some(name) = args.first().and_then(|first| doc.string_value(*first)) else {
            return;
        };

        outcome.add_dependency(seen, &name);
        if name != self.multiplex_handler {
            return;
        }
        outcome.declares_multiplex = true;

        let props = args.get(1).filter(|n| n.kind() == "object");
        let routes = props
            .and_then(|props| doc.property(*props, "routes"))
            .filter(|routes| routes.kind() == "array");
        let Some(routes) = routes else {
            return;
        };
        for element in doc.named_children(routes) {
            if element.kind() != "object" {
                continue;
            }
            if let Some(component) = doc.string_property(element, "component") {
                outcome.add_dependency(seen, &component);
                if let Some(path) = doc.string_property(element, "path") {
                    outcome.multiplex.push(MultiplexEntry { path, component });
                }
            }
        }
    }
}

/// `import X from '.../Components/Visual/X/X.js'` refers to component `X`
fn component_import(doc: &JsDocument<'_>, import: Node<'_>) -> Option<String> {
    let source = doc.string_value(import.child_by_field_name("source")?)?;
    if !source.contains("/Components/") {
        return None;
    }
    let last = source.rsplit('/').next()?;
    let name = last.strip_suffix(".js").unwrap_or(last);
    Some(name.to_string())
}

enum ScanResult {
    Scanned(ScanOutcome),
    Failed(Warning),
}

fn scan_one(
    parser: &mut JsParser,
    extractor: &DependencyExtractor,
    name: &str,
    path: &Path,
) -> ScanResult {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            return ScanResult::Failed(Warning::emit(
                WarningKind::MissingSource,
                Some(name),
                format!("cannot read {} ({}), treated as having no dependencies", path.display(), e),
            ))
        }
    };
    match extractor.extract(parser, &source) {
        Ok(outcome) => ScanResult::Scanned(outcome),
        Err(message) => ScanResult::Failed(Warning::emit(
            WarningKind::ParseFailure,
            Some(name),
            format!("{} in {}, treated as having no dependencies", message, path.display()),
        )),
    }
}

/// Scan every registered component in parallel and record its direct
/// dependencies and multiplex declarations. Results are applied in discovery
/// order so scheduling never affects the outcome.
pub fn scan_components(registry: &mut Registry, config: &ScanConfig) -> Result<Vec<Warning>> {
    let extractor = DependencyExtractor::from_config(config);
    let jobs: Vec<(String, PathBuf)> = registry
        .iter()
        .map(|c| (c.name.clone(), c.source_path()))
        .collect();

    let results: Vec<(String, ScanResult)> = run_with_workers(config.workers, || {
        jobs.par_iter()
            .map_init(JsParser::new, |parser, (name, path)| -> Result<(String, ScanResult)> {
                let parser = parser
                    .as_mut()
                    .map_err(|e| BundlerError::Grammar(e.to_string()))?;
                Ok((name.clone(), scan_one(parser, &extractor, name, path)))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut warnings = Vec::new();
    for (name, result) in results {
        let Some(record) = registry.get_mut(&name) else {
            continue;
        };
        match result {
            ScanResult::Scanned(outcome) => {
                tracing::debug!("{} depends on {:?}", name, outcome.dependencies);
                record.dependencies = outcome.dependencies;
                record.multiplex_declared = outcome.declares_multiplex;
                record.multiplex_entries = outcome.multiplex;
            }
            ScanResult::Failed(warning) => {
                record.dependencies.clear();
                record.multiplex_declared = false;
                record.multiplex_entries.clear();
                warnings.push(warning);
            }
        }
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> ScanOutcome {
        let mut parser = JsParser::new().unwrap();
        DependencyExtractor::new("slice.build", "MultiRoute")
            .extract(&mut parser, source)
            .unwrap()
    }

    #[test]
    fn test_direct_references() {
        let outcome = extract(
            r#"
            export default class HomePage extends HTMLElement {
                async init() {
                    const nav = await slice.build('Navbar', { items: [] });
                    const card = await window.slice.build("Card", {});
                    const again = await slice.build('Navbar');
                    const dynamic = await slice.build(name);
                }
            }
            customElements.define('slice-home', HomePage);
            "#,
        );
        assert_eq!(outcome.dependencies, vec!["Navbar", "Card"]);
        assert!(!outcome.declares_multiplex);
        assert!(outcome.multiplex.is_empty());
    }

    #[test]
    fn test_multiplex_declaration() {
        let outcome = extract(
            r#"
            const router = await slice.build('MultiRoute', {
                routes: [
                    { path: '/x', component: 'X' },
                    { path: '/y', component: 'Y' },
                    { path: '/z', component: 'Z' },
                ],
            });
            "#,
        );
        assert_eq!(outcome.dependencies, vec!["MultiRoute", "X", "Y", "Z"]);
        assert!(outcome.declares_multiplex);
        assert_eq!(outcome.multiplex.len(), 3);
        assert_eq!(outcome.multiplex[1].path, "/y");
        assert_eq!(outcome.multiplex[1].component, "Y");
    }

    #[test]
    fn test_multiplex_with_computed_paths() {
        let outcome = extract(
            r#"
            const BASE = '/m';
            const router = await slice.build('MultiRoute', {
                routes: [
                    { path: BASE + '/x', component: 'X' },
                    { path: `${BASE}/y`, component: 'Y' },
                ],
            });
            "#,
        );
        assert!(outcome.declares_multiplex);
        assert_eq!(outcome.dependencies, vec!["MultiRoute", "X", "Y"]);
        assert!(outcome.multiplex.is_empty());
    }

    #[test]
    fn test_component_imports() {
        let outcome = extract(
            r#"
            import Button from '../../Components/Visual/Button/Button.js';
            import helper from './helper.js';
            "#,
        );
        assert_eq!(outcome.dependencies, vec!["Button"]);
    }

    #[test]
    fn test_no_invocations_is_empty() {
        assert_eq!(extract("const x = 1 + 2;"), ScanOutcome::default());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut parser = JsParser::new().unwrap();
        let result = DependencyExtractor::new("slice.build", "MultiRoute")
            .extract(&mut parser, "slice.build('A', {");
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_bare_callee() {
        let mut parser = JsParser::new().unwrap();
        let outcome = DependencyExtractor::new("build", "MultiRoute")
            .extract(&mut parser, "build('Widget'); slice.build('Other');")
            .unwrap();
        assert_eq!(outcome.dependencies, vec!["Widget"]);
    }
}
