//! Final route selection strategies

use crate::routing::cost::compare_cost;
use crate::routing::scoring::compare_ranked;
use crate::routing::{RouteCost, WeightedRoute};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Selection strategy determines how the final route is picked from the
/// top-K scored candidates once their costs are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Cheapest of the top-K; equal costs go to the lower route id
    #[default]
    LeastCost,

    /// Highest score; equal scores go to the lower route id
    ScoreFirst,
}

/// A chosen route with the cost that justified it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSelection {
    pub route: WeightedRoute,
    pub cost: RouteCost,
    /// Number of costed candidates the choice was made from
    pub considered: usize,
}

impl SelectionStrategy {
    /// Pick one route from scored candidates paired with their costs.
    ///
    /// Returns `None` for an empty candidate list.
    pub fn select(&self, candidates: Vec<(WeightedRoute, RouteCost)>) -> Option<RouteSelection> {
        let considered = candidates.len();
        let chosen = match self {
            SelectionStrategy::LeastCost => candidates
                .into_iter()
                .min_by(|(_, ca), (_, cb)| compare_cost(ca, cb)),
            SelectionStrategy::ScoreFirst => candidates
                .into_iter()
                .min_by(|(wa, _), (wb, _)| compare_ranked(wa, wb)),
        };

        chosen.map(|(route, cost)| RouteSelection {
            route,
            cost,
            considered,
        })
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "least_cost" => Ok(SelectionStrategy::LeastCost),
            "score_first" => Ok(SelectionStrategy::ScoreFirst),
            _ => Err(format!("Unknown selection strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStrategy::LeastCost => write!(f, "least_cost"),
            SelectionStrategy::ScoreFirst => write!(f, "score_first"),
        }
    }
}
