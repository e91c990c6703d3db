//! Content-based recommendations in one-hot attribute space
//!
//! A user's profile is the purchase-value-weighted mean of the feature
//! vectors of their top-K train purchases. Every product the user has not
//! bought is scored by cosine similarity to that profile.

use super::{Deadline, Recommender};
use crate::config::ContentConfig;
use crate::error::Result;
use crate::matrix::{cosine_from_parts, Dataset};
use crate::types::{HouseholdId, ProductId, RecommendationList, ScoredProduct, Shortfall};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Products scored between deadline checks
const DEADLINE_STRIDE: usize = 4096;

/// Weighted preference vector of one household
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub household_id: HouseholdId,
    /// Purchases that contributed, as `(product_id, normalised weight)`
    pub weights: Vec<(ProductId, f64)>,
    /// Dense vector over the feature vocabulary
    pub vector: Vec<f64>,
}

impl UserProfile {
    pub fn norm(&self) -> f64 {
        self.vector.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.vector.iter().all(|v| *v == 0.0)
    }
}

pub struct ContentBasedRecommender {
    dataset: Arc<Dataset>,
    config: ContentConfig,
}

impl ContentBasedRecommender {
    pub fn new(dataset: Arc<Dataset>, config: ContentConfig) -> Self {
        Self { dataset, config }
    }

    /// Profile from the user's top-K train purchases.
    ///
    /// `None` for users without train history. Purchases of products that
    /// have no feature vector are skipped and the remaining weights
    /// renormalised; if none remain the profile is all zeros.
    pub fn user_profile(&self, household_id: HouseholdId) -> Option<UserProfile> {
        let train = &self.dataset.train;
        let features = &self.dataset.features;
        if !train.contains_user(household_id) {
            return None;
        }

        let top = train.top_purchases(household_id, self.config.top_k_purchases);
        let mut usable: Vec<(ProductId, f64)> = Vec::with_capacity(top.len());
        for (col, value) in top {
            let Some(product_id) = train.product_id(col) else {
                continue;
            };
            if features.contains(product_id) {
                usable.push((product_id, value));
            } else {
                debug!(
                    household_id,
                    product_id, "Purchase has no feature vector, skipped in profile"
                );
            }
        }

        let total: f64 = usable.iter().map(|(_, v)| v).sum();
        let mut vector = vec![0.0; features.dimension()];
        let mut weights = Vec::with_capacity(usable.len());
        if total > 0.0 {
            for (product_id, value) in usable {
                let weight = value / total;
                if let Some(row) = features.vector(product_id) {
                    for (feature, x) in row.iter() {
                        vector[feature] += weight * x;
                    }
                }
                weights.push((product_id, weight));
            }
        }

        Some(UserProfile {
            household_id,
            weights,
            vector,
        })
    }
}

impl Recommender for ContentBasedRecommender {
    fn name(&self) -> &'static str {
        "content-based"
    }

    fn recommend(
        &self,
        household_id: HouseholdId,
        n: usize,
        deadline: &Deadline,
    ) -> Result<RecommendationList> {
        let Some(profile) = self.user_profile(household_id) else {
            return Ok(RecommendationList::empty(household_id, Shortfall::ColdStart));
        };
        deadline.check(household_id)?;

        if profile.is_zero() {
            warn!(household_id, "Zero preference profile, no content candidates");
            return Ok(RecommendationList::empty(household_id, Shortfall::Sparsity));
        }
        let profile_norm = profile.norm();

        let purchased: HashSet<ProductId> = self
            .dataset
            .train
            .purchases(household_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut candidates = Vec::new();
        for (scanned, (product_id, vector)) in self.dataset.features.iter().enumerate() {
            if scanned % DEADLINE_STRIDE == 0 {
                deadline.check(household_id)?;
            }
            if purchased.contains(&product_id) {
                continue;
            }
            let score = cosine_from_parts(vector.dot_dense(&profile.vector), profile_norm, vector.norm());
            if score > 0.0 {
                candidates.push(ScoredProduct::new(product_id, score));
            }
        }

        Ok(RecommendationList::ranked_or_sparse(household_id, candidates, n))
    }
}
