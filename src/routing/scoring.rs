//! Dynamic call distribution: multi-factor route scoring

use crate::config::{ConfigError, ScoringConfig};
use crate::routing::{Route, RouteMetrics, RoutingError, WeightedRoute};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Ranks candidate routes by a weighted blend of latency, spare capacity
/// and reliability.
///
/// Scores fall in `[0, 1]`; higher is better. Output ordering is fully
/// deterministic: equal scores are ordered by route identifier.
#[derive(Debug, Clone)]
pub struct RouteScorer {
    config: ScoringConfig,
}

impl RouteScorer {
    /// Create a scorer, rejecting weights that do not sum to 1.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a single route.
    ///
    /// Out-of-range measurements fail with [`RoutingError::InvalidMetric`]
    /// instead of being clamped.
    pub fn score_route(
        &self,
        route: &Route,
        metrics: RouteMetrics,
    ) -> Result<WeightedRoute, RoutingError> {
        validate_metrics(route, &metrics)?;

        let ceiling = self.config.latency_ceiling_ms;
        let norm_latency = 1.0 - metrics.latency_ms.min(ceiling) / ceiling;

        let score = self.config.latency_weight * norm_latency
            + self.config.load_weight * (1.0 - metrics.load)
            + self.config.reliability_weight * metrics.reliability;

        Ok(WeightedRoute {
            route: route.clone(),
            score,
            metrics,
        })
    }

    /// Score and rank a candidate set, highest score first.
    ///
    /// Duplicate candidates are scored once. A route whose metrics are
    /// invalid is excluded and the rest are still ranked; any other lookup
    /// failure aborts the ranking. Fails with
    /// [`RoutingError::NoRoutesAvailable`] when nothing is left to rank.
    pub fn score<F>(
        &self,
        candidates: &[Route],
        mut metrics_for: F,
    ) -> Result<Vec<WeightedRoute>, RoutingError>
    where
        F: FnMut(&Route) -> Result<RouteMetrics, RoutingError>,
    {
        let unique: BTreeSet<&Route> = candidates.iter().collect();
        let mut scored = Vec::with_capacity(unique.len());

        for route in unique {
            let result = metrics_for(route).and_then(|m| self.score_route(route, m));
            match result {
                Ok(weighted) => {
                    tracing::trace!(route = %route, score = weighted.score, "Route scored");
                    scored.push(weighted);
                }
                Err(e) if e.is_route_local() => {
                    tracing::warn!(route = %route, error = %e, "Route excluded from ranking");
                    metrics::counter!(
                        "callroute_routes_rejected_total",
                        "reason" => "invalid_metric",
                    )
                    .increment(1);
                }
                Err(e) => return Err(e),
            }
        }

        if scored.is_empty() {
            return Err(RoutingError::NoRoutesAvailable);
        }

        scored.sort_by(compare_ranked);
        Ok(scored)
    }
}

/// Highest score first, then route identifier ascending
pub(crate) fn compare_ranked(a: &WeightedRoute, b: &WeightedRoute) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.route.cmp(&b.route))
}

fn validate_metrics(route: &Route, metrics: &RouteMetrics) -> Result<(), RoutingError> {
    let invalid = |field: &'static str, value: f64| RoutingError::InvalidMetric {
        route: route.clone(),
        field,
        value,
    };

    if !metrics.latency_ms.is_finite() || metrics.latency_ms < 0.0 {
        return Err(invalid("latency", metrics.latency_ms));
    }
    if !(0.0..=1.0).contains(&metrics.load) {
        return Err(invalid("load", metrics.load));
    }
    if !(0.0..=1.0).contains(&metrics.reliability) {
        return Err(invalid("reliability", metrics.reliability));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scorer() -> RouteScorer {
        RouteScorer::new(ScoringConfig::default()).unwrap()
    }

    fn lookup(
        table: HashMap<&'static str, RouteMetrics>,
    ) -> impl FnMut(&Route) -> Result<RouteMetrics, RoutingError> {
        move |route: &Route| Ok(table[route.id()])
    }

    #[test]
    fn score_matches_worked_example() {
        let weighted = scorer()
            .score_route(&Route::from("r1"), RouteMetrics::new(50.0, 0.2, 0.98))
            .unwrap();
        assert!((weighted.score - 0.834).abs() < 1e-9);
    }

    #[test]
    fn latency_beyond_ceiling_earns_nothing() {
        let s = scorer();
        let at_ceiling = s
            .score_route(&Route::from("a"), RouteMetrics::new(200.0, 0.0, 1.0))
            .unwrap();
        let beyond = s
            .score_route(&Route::from("a"), RouteMetrics::new(5000.0, 0.0, 1.0))
            .unwrap();
        assert!((at_ceiling.score - 0.6).abs() < 1e-12);
        assert_eq!(at_ceiling.score, beyond.score);
    }

    #[test]
    fn perfect_route_scores_one() {
        let weighted = scorer()
            .score_route(&Route::from("a"), RouteMetrics::new(0.0, 0.0, 1.0))
            .unwrap();
        assert!((weighted.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unbalanced_weights() {
        let config = ScoringConfig {
            latency_weight: 0.4,
            load_weight: 0.4,
            reliability_weight: 0.3,
            ..Default::default()
        };
        assert!(RouteScorer::new(config).is_err());
    }

    #[test]
    fn rejects_out_of_range_metrics() {
        let s = scorer();
        let route = Route::from("bad");
        for metrics in [
            RouteMetrics::new(-1.0, 0.5, 0.5),
            RouteMetrics::new(10.0, 1.5, 0.5),
            RouteMetrics::new(10.0, 0.5, -0.1),
            RouteMetrics::new(f64::NAN, 0.5, 0.5),
        ] {
            let err = s.score_route(&route, metrics).unwrap_err();
            assert!(matches!(err, RoutingError::InvalidMetric { .. }), "{err:?}");
        }
    }

    #[test]
    fn ranks_highest_score_first() {
        let table = HashMap::from([
            ("slow", RouteMetrics::new(180.0, 0.1, 0.99)),
            ("fast", RouteMetrics::new(20.0, 0.1, 0.99)),
            ("busy", RouteMetrics::new(20.0, 0.9, 0.99)),
        ]);
        let candidates: Vec<Route> = ["slow", "fast", "busy"].map(Route::from).to_vec();

        let ranked = scorer().score(&candidates, lookup(table)).unwrap();
        let order: Vec<&str> = ranked.iter().map(|w| w.route.id()).collect();
        assert_eq!(order, vec!["fast", "busy", "slow"]);
    }

    #[test]
    fn ties_break_by_route_id() {
        let same = RouteMetrics::new(40.0, 0.3, 0.9);
        let table = HashMap::from([("zeta", same), ("alpha", same), ("mid", same)]);
        let candidates: Vec<Route> = ["zeta", "alpha", "mid"].map(Route::from).to_vec();

        let ranked = scorer().score(&candidates, lookup(table)).unwrap();
        let order: Vec<&str> = ranked.iter().map(|w| w.route.id()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn empty_candidates_is_error() {
        let result = scorer().score(&[], |_| Ok(RouteMetrics::new(0.0, 0.0, 1.0)));
        assert_eq!(result.unwrap_err(), RoutingError::NoRoutesAvailable);
    }

    #[test]
    fn invalid_route_is_excluded_others_ranked() {
        let table = HashMap::from([
            ("good", RouteMetrics::new(30.0, 0.2, 0.95)),
            ("broken", RouteMetrics::new(30.0, 2.0, 0.95)),
        ]);
        let candidates: Vec<Route> = ["good", "broken"].map(Route::from).to_vec();

        let ranked = scorer().score(&candidates, lookup(table)).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].route.id(), "good");
    }

    #[test]
    fn all_invalid_routes_is_no_routes() {
        let candidates = vec![Route::from("a"), Route::from("b")];
        let result = scorer().score(&candidates, |_| Ok(RouteMetrics::new(-5.0, 0.1, 0.9)));
        assert_eq!(result.unwrap_err(), RoutingError::NoRoutesAvailable);
    }

    #[test]
    fn unavailable_metric_propagates() {
        let candidates = vec![Route::from("a")];
        let result = scorer().score(&candidates, |route| {
            Err(RoutingError::MetricUnavailable {
                route: route.clone(),
                metric: "load",
                reason: "timeout".to_string(),
            })
        });
        assert!(matches!(
            result,
            Err(RoutingError::MetricUnavailable { metric: "load", .. })
        ));
    }

    #[test]
    fn duplicate_candidates_scored_once() {
        let candidates = vec![Route::from("a"), Route::from("a")];
        let ranked = scorer()
            .score(&candidates, |_| Ok(RouteMetrics::new(10.0, 0.1, 0.9)))
            .unwrap();
        assert_eq!(ranked.len(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn metrics_strategy() -> impl Strategy<Value = RouteMetrics> {
            (0.0f64..1000.0, 0.0f64..=1.0, 0.0f64..=1.0)
                .prop_map(|(l, load, rel)| RouteMetrics::new(l, load, rel))
        }

        fn weights_strategy() -> impl Strategy<Value = ScoringConfig> {
            (0.0f64..=1.0, 0.0f64..=1.0).prop_map(|(a, b)| {
                let alpha = a;
                let beta = (1.0 - alpha) * b;
                ScoringConfig {
                    latency_weight: alpha,
                    load_weight: beta,
                    reliability_weight: (1.0 - alpha - beta).max(0.0),
                    ..Default::default()
                }
            })
        }

        proptest! {
            /// Identical inputs always produce identical ordering, tie-breaks included.
            #[test]
            fn prop_ranking_is_deterministic(
                config in weights_strategy(),
                samples in prop::collection::vec(metrics_strategy(), 1..12),
            ) {
                let scorer = RouteScorer::new(config).unwrap();
                let candidates: Vec<Route> =
                    (0..samples.len()).map(|i| Route::new(format!("route-{i:02}"))).collect();
                let metrics_for = |route: &Route| -> Result<RouteMetrics, RoutingError> {
                    let idx: usize = route.id()[6..].parse().unwrap();
                    Ok(samples[idx])
                };

                let first = scorer.score(&candidates, metrics_for).unwrap();
                let mut reversed = candidates.clone();
                reversed.reverse();
                let second = scorer.score(&reversed, metrics_for).unwrap();

                prop_assert_eq!(first, second);
            }

            /// Scores stay inside [0, 1] for in-range measurements.
            #[test]
            fn prop_score_is_bounded(config in weights_strategy(), m in metrics_strategy()) {
                let scorer = RouteScorer::new(config).unwrap();
                let weighted = scorer.score_route(&Route::from("r"), m).unwrap();
                prop_assert!(weighted.score >= -1e-9 && weighted.score <= 1.0 + 1e-9);
            }
        }
    }
}
