//! Route classification for the hybrid strategy
//!
//! A classifier maps every route path to a bucket key. It must be total and
//! deterministic: the same path always lands in the same bucket.

use crate::config::{ClassifierConfig, ClassifierRule};

/// Maps a route path to the bucket whose bundle serves it
pub trait RouteClassifier: Send + Sync {
    fn classify(&self, path: &str) -> String;
}

impl<F> RouteClassifier for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn classify(&self, path: &str) -> String {
        self(path)
    }
}

/// Ordered keyword rules over the lowercased path; first match wins
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<ClassifierRule>,
    fallback: String,
}

impl KeywordClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let lower = |values: &[String]| values.iter().map(|v| v.to_lowercase()).collect();
        Self {
            rules: config
                .rules
                .iter()
                .map(|rule| ClassifierRule {
                    bucket: rule.bucket.clone(),
                    exact: lower(&rule.exact),
                    contains: lower(&rule.contains),
                })
                .collect(),
            fallback: config.fallback.clone(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl RouteClassifier for KeywordClassifier {
    fn classify(&self, path: &str) -> String {
        let path = path.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.exact.iter().any(|e| *e == path)
                    || rule.contains.iter().any(|k| path.contains(k.as_str()))
            })
            .map(|rule| rule.bucket.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}
