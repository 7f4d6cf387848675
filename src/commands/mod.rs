//! Commands
//!
//! Handlers behind the CLI subcommands. Each returns `anyhow::Result` and
//! prints its own human-facing output.

pub mod analyze;
pub mod build;
pub mod clean;
pub mod info;

pub use analyze::{execute_analyze, AnalyzeOptions};
pub use build::{execute_build, BuildOptions};
pub use clean::{execute_clean, CleanOptions};
pub use info::{execute_info, InfoOptions};
