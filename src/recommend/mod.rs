//! Recommendation algorithms
//!
//! Three recommenders share one read-only `Dataset`:
//!
//! - **ContentBasedRecommender**: cosine between a user's weighted purchase
//!   profile and every product in one-hot attribute space
//! - **UserUserRecommender**: similarity-weighted average over the k nearest
//!   mean-centred households
//! - **ItemItemRecommender**: batched on-demand item similarity against the
//!   user's top purchases
//!
//! All of them return an empty list tagged with a `Shortfall` for cold-start
//! and sparse users instead of failing, and honour a cooperative `Deadline`.

pub mod batches;
pub mod content_based;
pub mod item_item;
pub mod user_user;

pub use batches::{ItemBatch, ItemBatches};
pub use content_based::{ContentBasedRecommender, UserProfile};
pub use item_item::ItemItemRecommender;
pub use user_user::{UserSimilarity, UserUserRecommender};

use crate::config::EngineConfig;
use crate::error::{Result, ShelfwiseError};
use crate::matrix::Dataset;
use crate::types::{HouseholdId, RecommendationList};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// A batch recommender over a fixed dataset
pub trait Recommender: Send + Sync {
    /// Algorithm name used as the report key
    fn name(&self) -> &'static str;

    /// Up to `n` ranked products the household has not bought in train
    fn recommend(
        &self,
        household_id: HouseholdId,
        n: usize,
        deadline: &Deadline,
    ) -> Result<RecommendationList>;
}

/// Cooperative time budget for one user's recommendation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    /// No limit
    pub fn none() -> Self {
        Self {
            expires_at: None,
            budget: Duration::MAX,
        }
    }

    /// Expires `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
            budget,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() >= at)
            .unwrap_or(false)
    }

    /// `Timeout` once the budget is spent
    pub fn check(&self, household_id: HouseholdId) -> Result<()> {
        if self.is_expired() {
            Err(ShelfwiseError::Timeout {
                household_id,
                budget_ms: self.budget.as_millis().min(u64::MAX as u128) as u64,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    ContentBased,
    UserUser,
    ItemItem,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::ContentBased,
        Algorithm::UserUser,
        Algorithm::ItemItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::ContentBased => "content-based",
            Algorithm::UserUser => "user-user",
            Algorithm::ItemItem => "item-item",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = ShelfwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "content-based" | "content" => Ok(Algorithm::ContentBased),
            "user-user" | "user" => Ok(Algorithm::UserUser),
            "item-item" | "item" => Ok(Algorithm::ItemItem),
            other => Err(ShelfwiseError::InvalidOperation(format!(
                "Unknown algorithm '{}' (expected content-based, user-user or item-item)",
                other
            ))),
        }
    }
}

/// Fit the selected algorithm on `dataset`.
///
/// User-user fitting builds the full similarity matrix and blocks for a
/// while on large data; call it off the async executor.
pub fn build_recommender(
    algorithm: Algorithm,
    dataset: Arc<Dataset>,
    config: &EngineConfig,
) -> Arc<dyn Recommender> {
    let started = Instant::now();
    let recommender: Arc<dyn Recommender> = match algorithm {
        Algorithm::ContentBased => Arc::new(ContentBasedRecommender::new(
            dataset,
            config.content.clone(),
        )),
        Algorithm::UserUser => Arc::new(UserUserRecommender::fit(
            dataset,
            config.user_user.clone(),
        )),
        Algorithm::ItemItem => Arc::new(ItemItemRecommender::new(
            dataset,
            config.item_item.clone(),
        )),
    };
    info!(
        algorithm = algorithm.as_str(),
        "Fitted recommender in {:.2?}",
        started.elapsed()
    );
    recommender
}
