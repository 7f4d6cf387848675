//! Strategy Selector

use super::Strategy;
use crate::analysis::Metrics;
use crate::config::StrategyConfig;

/// Pick a strategy from the component count and shared percentage alone
pub fn select_strategy(
    total_components: usize,
    shared_percentage: f64,
    config: &StrategyConfig,
) -> Strategy {
    if total_components < config.global_max_components
        || shared_percentage > config.global_shared_percentage
    {
        Strategy::Global
    } else if total_components < config.hybrid_max_components {
        Strategy::Hybrid
    } else {
        Strategy::PerRoute
    }
}

/// The configured strategy, or the selected one when the mode is `auto`
pub fn resolve_strategy(metrics: &Metrics, config: &StrategyConfig) -> Strategy {
    config.mode.forced().unwrap_or_else(|| {
        select_strategy(metrics.total_components, metrics.shared_percentage, config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyMode;

    #[test]
    fn test_thresholds() {
        let config = StrategyConfig::default();
        assert_eq!(select_strategy(5, 0.0, &config), Strategy::Global);
        assert_eq!(select_strategy(50, 75.0, &config), Strategy::Global);
        assert_eq!(select_strategy(50, 30.0, &config), Strategy::Hybrid);
        assert_eq!(select_strategy(20, 60.0, &config), Strategy::Hybrid);
        assert_eq!(select_strategy(100, 10.0, &config), Strategy::PerRoute);
    }

    #[test]
    fn test_only_count_and_share_matter() {
        use crate::analysis::{CategoryStats, UsageEntry};

        let configs = [
            StrategyConfig::default(),
            StrategyConfig {
                global_max_components: 0,
                global_shared_percentage: 100.0,
                hybrid_max_components: 10,
                ..StrategyConfig::default()
            },
        ];
        for (total, pct) in [(0, 0.0), (19, 61.0), (42, 12.5), (250, 99.0)] {
            let small = Metrics {
                total_components: total,
                shared_percentage: pct,
                ..Metrics::default()
            };
            let busy = Metrics {
                total_components: total,
                shared_percentage: pct,
                total_routes: 400,
                shared_components: 7,
                total_size: 9_000_000,
                average_size: 36_000,
                by_category: [(
                    "Visual".to_string(),
                    CategoryStats {
                        count: total,
                        size: 9_000_000,
                    },
                )]
                .into_iter()
                .collect(),
                top_by_usage: vec![UsageEntry {
                    name: "Navbar".to_string(),
                    routes: 400,
                    size: 512,
                }],
            };
            for config in &configs {
                let expected = select_strategy(total, pct, config);
                assert_eq!(resolve_strategy(&small, config), expected);
                assert_eq!(resolve_strategy(&busy, config), expected);
            }
        }

        let relaxed = &configs[1];
        assert_eq!(select_strategy(0, 0.0, relaxed), Strategy::Hybrid);
        assert_eq!(select_strategy(42, 12.5, relaxed), Strategy::PerRoute);
    }

    #[test]
    fn test_forced_mode_wins() {
        let config = StrategyConfig {
            mode: StrategyMode::PerRoute,
            ..StrategyConfig::default()
        };
        let metrics = Metrics {
            total_components: 3,
            ..Metrics::default()
        };
        assert_eq!(resolve_strategy(&metrics, &config), Strategy::PerRoute);
        assert_eq!(
            resolve_strategy(&metrics, &StrategyConfig::default()),
            Strategy::Global
        );
    }
}
