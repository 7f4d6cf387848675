#![forbid(unsafe_code)]

//! # Slice Bundler
//!
//! Dependency analysis and bundle partitioning for Slice.js applications.
//!
//! ## Features
//!
//! - **Structured parsing**: registry, routes and component sources are parsed
//!   with tree-sitter, never evaluated
//! - **Dependency graph**: transitive closures with cycle truncation
//! - **Critical set**: greedy, budget-bounded selection of up-front components
//! - **Strategies**: global, hybrid (categorical buckets) or per-route bundles
//! - **Deterministic output**: artifacts and manifest are stable across runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use slice_bundler::{Bundler, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_from_root(".")?;
//!     let outcome = Bundler::new(".", config).build()?;
//!
//!     println!("{} bundles, {} warnings", outcome.rendered.len(), outcome.warnings.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod ast;
pub mod bundle;
pub mod bundler;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod project;
pub mod registry;
pub mod routes;
pub mod scan;
pub mod workers;

// Re-exports
pub use analysis::{Analysis, Analyzer, Metrics};
pub use bundle::{
    Bundle, BundleKind, BundlePlan, CriticalSet, KeywordClassifier, RouteClassifier, Strategy,
};
pub use bundler::{BuildOutcome, Bundler};
pub use config::{Config, StrategyMode, UnreachablePolicy};
pub use error::{BundlerError, Result, Warning, WarningKind};
pub use graph::DependencyGraph;
pub use manifest::BundleManifest;
pub use project::ProjectLayout;
pub use registry::{CategoryKind, ComponentRecord, Registry};
pub use routes::{RouteGroup, RouteRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
