//! Error types
//!
//! Fatal failures abort the run through [`BundlerError`]. Problems scoped to a
//! single component or bundle never abort; they are collected as [`Warning`]s
//! and reported in the final summary.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result type for bundler operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Fatal errors. Any of these aborts the run before an artifact is written.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required file not found: {0}")]
    MissingProjectFile(PathBuf),

    #[error("Could not parse component registry {path}: {message}")]
    RegistryParse { path: PathBuf, message: String },

    #[error("Invalid category configuration {path}: {message}")]
    CategoryConfig { path: PathBuf, message: String },

    #[error("Could not parse route manifest {path}: {message}")]
    RouteParse { path: PathBuf, message: String },

    #[error("JavaScript grammar unavailable: {0}")]
    Grammar(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Kind of a component-scoped, recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Registered component whose directory is absent on disk
    MissingComponentDir,
    /// Component directory without its primary source file
    MissingSource,
    /// Primary source could not be parsed for dependency extraction
    ParseFailure,
    /// Route pointing at a component that is not registered
    UnknownRouteTarget,
    /// Route path declared more than once
    DuplicateRoute,
    /// File missing while assembling a bundle artifact
    MissingFile,
    /// Component reachable from no route and not always-loaded
    Unreachable,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MissingComponentDir => "missing-component-dir",
            WarningKind::MissingSource => "missing-source",
            WarningKind::ParseFailure => "parse-failure",
            WarningKind::UnknownRouteTarget => "unknown-route-target",
            WarningKind::DuplicateRoute => "duplicate-route",
            WarningKind::MissingFile => "missing-file",
            WarningKind::Unreachable => "unreachable",
        }
    }
}

/// A recoverable problem tied to one component (or route)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, component: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            component: component.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create the warning and log it in one step
    pub fn emit(kind: WarningKind, component: Option<&str>, message: impl Into<String>) -> Self {
        let warning = Self::new(kind, component, message);
        tracing::warn!(kind = warning.kind.as_str(), "{}", warning);
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(name) => write!(f, "{}: {}", name, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
