//! Per-user ranking metrics against held-out purchases

use crate::types::{HouseholdId, ProductId, RecommendationList};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of recommended products the household went on to buy
pub fn hits(list: &RecommendationList, relevant: &HashSet<ProductId>) -> usize {
    list.product_ids().filter(|id| relevant.contains(id)).count()
}

/// Hits over the requested list size `n`, not the returned length
pub fn precision_at_n(hits: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (hits as f64 / n as f64).min(1.0)
}

/// Hits over the number of distinct test purchases
pub fn recall_at_n(hits: usize, relevant: usize) -> f64 {
    if relevant == 0 {
        return 0.0;
    }
    (hits as f64 / relevant as f64).min(1.0)
}

/// Scores for one evaluated household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub household_id: HouseholdId,
    pub hits: usize,
    pub hit: bool,
    pub precision: f64,
    pub recall: f64,
    pub latency_ms: f64,
}

impl UserMetrics {
    pub fn score(
        list: &RecommendationList,
        relevant: &HashSet<ProductId>,
        n: usize,
        latency_ms: f64,
    ) -> Self {
        let hits = hits(list, relevant);
        Self {
            household_id: list.household_id,
            hits,
            hit: hits > 0,
            precision: precision_at_n(hits, n),
            recall: recall_at_n(hits, relevant.len()),
            latency_ms,
        }
    }
}
