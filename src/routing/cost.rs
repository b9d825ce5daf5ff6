//! Least-cost routing: monetary and resource cost of a route

use crate::config::{ConfigError, CostConfig};
use crate::routing::{CostComponent, Route, RouteCost, RoutingError};
use std::cmp::Ordering;

/// Computes `sum(weight_i * cost_i) + delay_weight * delay_ms` for a route.
///
/// The evaluator never discovers routes on its own; callers hand it the
/// candidates, normally the top of the scorer's ranking.
#[derive(Debug, Clone)]
pub struct CostEvaluator {
    config: CostConfig,
}

impl CostEvaluator {
    pub fn new(config: CostConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Evaluate one route's cost.
    ///
    /// Negative or non-finite costs, weights or delay are rejected.
    pub fn evaluate(
        &self,
        route: &Route,
        components: &[CostComponent],
        delay_ms: f64,
    ) -> Result<RouteCost, RoutingError> {
        if !delay_ms.is_finite() || delay_ms < 0.0 {
            return Err(RoutingError::InvalidMetric {
                route: route.clone(),
                field: "delay",
                value: delay_ms,
            });
        }

        let mut component_costs = Vec::with_capacity(components.len());
        let mut weighted_sum = 0.0;
        for (i, component) in components.iter().enumerate() {
            let weight = component
                .weight
                .unwrap_or(self.config.default_component_weight);
            if !weight.is_finite() || weight < 0.0 {
                return Err(RoutingError::InvalidCost {
                    route: route.clone(),
                    message: format!("component {} has weight {}", i, weight),
                });
            }
            if !component.cost.is_finite() || component.cost < 0.0 {
                return Err(RoutingError::InvalidCost {
                    route: route.clone(),
                    message: format!("component {} has cost {}", i, component.cost),
                });
            }
            weighted_sum += weight * component.cost;
            component_costs.push((weight, component.cost));
        }

        let total_cost = weighted_sum + self.config.delay_weight * delay_ms;

        tracing::trace!(
            route = %route,
            weighted_sum,
            delay_ms,
            total_cost,
            "Route cost evaluated"
        );

        Ok(RouteCost {
            route: route.clone(),
            total_cost,
            component_costs,
            delay_ms,
        })
    }

    /// Order costs cheapest first, ties by route identifier
    pub fn rank(&self, mut costs: Vec<RouteCost>) -> Vec<RouteCost> {
        costs.sort_by(compare_cost);
        costs
    }

    /// The cheapest route, or `None` for an empty input
    pub fn cheapest(&self, costs: &[RouteCost]) -> Option<RouteCost> {
        costs.iter().min_by(|a, b| compare_cost(a, b)).cloned()
    }
}

/// Lowest total cost first, then route identifier ascending
pub(crate) fn compare_cost(a: &RouteCost, b: &RouteCost) -> Ordering {
    a.total_cost
        .total_cmp(&b.total_cost)
        .then_with(|| a.route.cmp(&b.route))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> CostEvaluator {
        CostEvaluator::new(CostConfig::default()).unwrap()
    }

    fn cost_of(route: &str, total_cost: f64) -> RouteCost {
        RouteCost {
            route: Route::from(route),
            total_cost,
            component_costs: vec![],
            delay_ms: 0.0,
        }
    }

    #[test]
    fn total_matches_worked_example() {
        let components = [
            CostComponent::weighted(0.5, 4.0),
            CostComponent::weighted(0.3, 2.0),
            CostComponent::weighted(0.2, 1.0),
        ];
        let cost = evaluator()
            .evaluate(&Route::from("r1"), &components, 40.0)
            .unwrap();
        assert!((cost.total_cost - 10.8).abs() < 1e-9);
        assert_eq!(cost.component_costs, vec![(0.5, 4.0), (0.3, 2.0), (0.2, 1.0)]);
        assert_eq!(cost.delay_ms, 40.0);
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let components = [CostComponent::new(3.0), CostComponent::weighted(2.0, 1.5)];
        let cost = evaluator()
            .evaluate(&Route::from("r1"), &components, 0.0)
            .unwrap();
        assert!((cost.total_cost - 6.0).abs() < 1e-12);
        assert_eq!(cost.component_costs[0], (1.0, 3.0));
    }

    #[test]
    fn delay_only_cost() {
        let cost = evaluator().evaluate(&Route::from("r1"), &[], 25.0).unwrap();
        assert!((cost.total_cost - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_inputs() {
        let e = evaluator();
        let route = Route::from("r1");
        assert!(matches!(
            e.evaluate(&route, &[], -1.0),
            Err(RoutingError::InvalidMetric { field: "delay", .. })
        ));
        assert!(matches!(
            e.evaluate(&route, &[CostComponent::new(-2.0)], 0.0),
            Err(RoutingError::InvalidCost { .. })
        ));
        assert!(matches!(
            e.evaluate(&route, &[CostComponent::weighted(-0.5, 2.0)], 0.0),
            Err(RoutingError::InvalidCost { .. })
        ));
    }

    #[test]
    fn rank_orders_cheapest_first_with_id_tiebreak() {
        let ranked = evaluator().rank(vec![
            cost_of("c", 2.0),
            cost_of("b", 1.0),
            cost_of("a", 2.0),
        ]);
        let order: Vec<&str> = ranked.iter().map(|c| c.route.id()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn cheapest_of_empty_is_none() {
        assert!(evaluator().cheapest(&[]).is_none());
        let best = evaluator()
            .cheapest(&[cost_of("y", 3.0), cost_of("x", 3.0)])
            .unwrap();
        assert_eq!(best.route.id(), "x");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Holding components fixed, more delay never costs less (strictly more when lambda > 0).
            #[test]
            fn prop_cost_increases_with_delay(
                costs in prop::collection::vec((0.0f64..10.0, 0.0f64..100.0), 0..6),
                delay in 0.0f64..1000.0,
                extra in 0.001f64..1000.0,
            ) {
                let e = evaluator();
                let components: Vec<CostComponent> =
                    costs.iter().map(|(w, c)| CostComponent::weighted(*w, *c)).collect();
                let route = Route::from("r");

                let base = e.evaluate(&route, &components, delay).unwrap();
                let later = e.evaluate(&route, &components, delay + extra).unwrap();
                prop_assert!(later.total_cost > base.total_cost);
            }
        }
    }
}
