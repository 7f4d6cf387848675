//! Bundler
//!
//! Runs the whole pipeline for one project: analysis, strategy selection,
//! assignment, emission and persistence. Every fatal check happens before the
//! first file is written, so a failed run leaves earlier output untouched.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::analysis::{Analysis, Analyzer};
use crate::bundle::{
    plan_bundles, resolve_strategy, write_artifacts, BundleEmitter, BundlePlan, KeywordClassifier,
    RenderedBundle, RouteClassifier, Strategy,
};
use crate::config::Config;
use crate::error::{Result, Warning};
use crate::manifest::BundleManifest;

/// Everything a finished build produced
#[derive(Debug)]
pub struct BuildOutcome {
    pub analysis: Analysis,
    pub plan: BundlePlan,
    pub rendered: Vec<RenderedBundle>,
    pub manifest: BundleManifest,
    /// Warnings from every stage, in pipeline order
    pub warnings: Vec<Warning>,
    pub artifacts: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub companion_path: PathBuf,
}

impl BuildOutcome {
    /// Percentage of requests saved against loading each component separately
    pub fn request_reduction(&self) -> f64 {
        let total = self.analysis.metrics.total_components;
        if total == 0 {
            return 0.0;
        }
        (1.0 - self.rendered.len() as f64 / total as f64) * 100.0
    }
}

/// Bundle pipeline for one project root
pub struct Bundler {
    analyzer: Analyzer,
    classifier: Box<dyn RouteClassifier>,
}

impl Bundler {
    pub fn new<P: AsRef<Path>>(root: P, config: Config) -> Self {
        let classifier = Box::new(KeywordClassifier::new(&config.classifier));
        Self {
            analyzer: Analyzer::new(root, config),
            classifier,
        }
    }

    /// Replace the route classifier used by the hybrid strategy
    pub fn with_classifier(mut self, classifier: Box<dyn RouteClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &Config {
        self.analyzer.config()
    }

    pub fn output_dir(&self) -> &Path {
        &self.analyzer.layout().output_dir
    }

    /// Analyse and assign without writing anything
    pub fn plan(&self) -> Result<(Analysis, BundlePlan, Strategy, Vec<Warning>)> {
        let analysis = self.analyzer.analyze()?;
        let strategy = resolve_strategy(&analysis.metrics, &self.config().strategy);
        tracing::info!(
            "Selected {} strategy ({} components, {:.1}% shared)",
            strategy,
            analysis.metrics.total_components,
            analysis.metrics.shared_percentage
        );
        let (plan, warnings) = plan_bundles(&analysis, strategy, self.config(), self.classifier.as_ref());
        Ok((analysis, plan, strategy, warnings))
    }

    /// Run the full pipeline and write artifacts, manifest and companion
    pub fn build(&self) -> Result<BuildOutcome> {
        let (analysis, plan, strategy, plan_warnings) = self.plan()?;
        let config = self.config();
        let generated = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let rendered = BundleEmitter::new(&analysis.registry, strategy, &config.runtime)
            .with_timestamp(generated.as_str())
            .with_workers(config.scan.workers)
            .render_all(&plan.bundles())?;

        let mut warnings = analysis.warnings.clone();
        warnings.extend(plan_warnings);
        warnings.extend(rendered.iter().flat_map(|r| r.warnings.iter().cloned()));

        let artifacts = write_artifacts(self.output_dir(), &rendered)?;
        let manifest = BundleManifest::build(&analysis, &plan, &rendered, &generated);
        let (manifest_path, companion_path) = manifest.persist(self.output_dir(), &config.output, &config.runtime)?;

        Ok(BuildOutcome {
            analysis,
            plan,
            rendered,
            manifest,
            warnings,
            artifacts,
            manifest_path,
            companion_path,
        })
    }
}
