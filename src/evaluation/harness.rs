//! Concurrent per-user evaluation of one recommender
//!
//! Every household in the test matrix is eligible. Each recommendation runs
//! on the blocking pool under a `Semaphore` of `workers` permits with a
//! cooperative `Deadline`, and `tokio::time::timeout` as a backstop. The
//! permit lives inside the blocking closure, so a call abandoned by the
//! backstop still holds its slot until it returns. A user
//! that times out, fails, or has no usable history becomes a coverage gap;
//! only build-level problems abort the run.

use super::metrics::UserMetrics;
use super::report::EvaluationResult;
use crate::config::EvaluationConfig;
use crate::error::{Result, ShelfwiseError};
use crate::matrix::Dataset;
use crate::recommend::{Deadline, Recommender};
use crate::types::{HouseholdId, ProductId, RecommendationList, Shortfall};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Extra wall time the backstop allows beyond the cooperative budget
const BACKSTOP_GRACE: Duration = Duration::from_secs(1);

/// What happened for one household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UserOutcome {
    Evaluated(UserMetrics),
    ColdStart,
    Sparse,
    TimedOut,
    Failed(String),
}

/// Outcome plus the list that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvaluation {
    pub household_id: HouseholdId,
    pub outcome: UserOutcome,
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<RecommendationList>,
}

/// Aggregate plus every per-user evaluation, sorted by household
#[derive(Debug, Clone)]
pub struct AlgorithmEvaluation {
    pub result: EvaluationResult,
    pub users: Vec<UserEvaluation>,
}

impl AlgorithmEvaluation {
    /// Lists that were actually produced, in household order
    pub fn recommendations(&self) -> Vec<RecommendationList> {
        self.users.iter().filter_map(|u| u.list.clone()).collect()
    }
}

pub struct EvaluationHarness {
    dataset: Arc<Dataset>,
    config: EvaluationConfig,
}

impl EvaluationHarness {
    pub fn new(dataset: Arc<Dataset>, config: EvaluationConfig) -> Self {
        Self { dataset, config }
    }

    /// Test households in ascending id order, capped at `max_users`
    pub fn eligible_users(&self) -> Vec<HouseholdId> {
        let users = self.dataset.test.households();
        match self.config.max_users {
            Some(cap) => users.take(cap).collect(),
            None => users.collect(),
        }
    }

    /// Distinct products the household bought in the test window
    pub fn relevant_products(&self, household_id: HouseholdId) -> HashSet<ProductId> {
        self.dataset
            .test
            .purchases(household_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Evaluate `recommender` over every eligible household
    pub async fn evaluate(&self, recommender: Arc<dyn Recommender>) -> Result<AlgorithmEvaluation> {
        let n = self.config.list_size;
        if n == 0 {
            return Err(ShelfwiseError::InvalidOperation(
                "list size must be at least 1".to_string(),
            ));
        }

        let users = self.eligible_users();
        let budget = self.config.per_user_timeout();
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let started = Instant::now();

        info!(
            algorithm = recommender.name(),
            users = users.len(),
            workers = self.config.workers,
            "Evaluating recommender"
        );

        let mut handles = Vec::with_capacity(users.len());
        for household_id in users {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ShelfwiseError::Other(format!("Worker pool closed: {}", e)))?;
            let recommender = recommender.clone();
            let relevant = self.relevant_products(household_id);

            handles.push(tokio::spawn(evaluate_user(
                recommender,
                household_id,
                n,
                budget,
                relevant,
                permit,
            )));
        }

        let mut evaluations = Vec::with_capacity(handles.len());
        for handle in handles {
            let evaluation = handle.await.map_err(|e| {
                error!("Evaluation task failed: {}", e);
                ShelfwiseError::Other(format!("Async execution failed: {}", e))
            })?;
            evaluations.push(evaluation);
        }
        evaluations.sort_by_key(|e| e.household_id);

        let result = EvaluationResult::aggregate(recommender.name(), n, &evaluations, &self.dataset);
        info!(
            algorithm = recommender.name(),
            evaluated = result.evaluated_users,
            eligible = result.eligible_users,
            hit_rate = result.hit_rate,
            "Evaluation finished in {:.2?}",
            started.elapsed()
        );

        Ok(AlgorithmEvaluation {
            result,
            users: evaluations,
        })
    }
}

async fn evaluate_user(
    recommender: Arc<dyn Recommender>,
    household_id: HouseholdId,
    n: usize,
    budget: Duration,
    relevant: HashSet<ProductId>,
    permit: OwnedSemaphorePermit,
) -> UserEvaluation {
    let algorithm = recommender.name();
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        recommender.recommend(household_id, n, &Deadline::after(budget))
    });

    let outcome = match tokio::time::timeout(budget.saturating_add(BACKSTOP_GRACE), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ShelfwiseError::Other(format!("Recommendation task panicked: {}", e))),
        Err(_) => Err(ShelfwiseError::Timeout {
            household_id,
            budget_ms: budget.as_millis().min(u64::MAX as u128) as u64,
        }),
    };
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(list) => match list.shortfall {
            Some(Shortfall::ColdStart) => {
                debug!(algorithm, household_id, "Cold start");
                gap(household_id, UserOutcome::ColdStart, latency_ms, Some(list))
            }
            Some(Shortfall::Sparsity) => {
                debug!(algorithm, household_id, "No usable candidates");
                gap(household_id, UserOutcome::Sparse, latency_ms, Some(list))
            }
            None => UserEvaluation {
                household_id,
                outcome: UserOutcome::Evaluated(UserMetrics::score(&list, &relevant, n, latency_ms)),
                latency_ms,
                list: Some(list),
            },
        },
        Err(ShelfwiseError::ColdStart { .. }) => {
            gap(household_id, UserOutcome::ColdStart, latency_ms, None)
        }
        Err(ShelfwiseError::Sparsity { .. }) => {
            gap(household_id, UserOutcome::Sparse, latency_ms, None)
        }
        Err(e @ ShelfwiseError::Timeout { .. }) => {
            warn!(algorithm, household_id, "{}", e);
            gap(household_id, UserOutcome::TimedOut, latency_ms, None)
        }
        Err(e) => {
            error!(algorithm, household_id, "Recommendation failed: {}", e);
            gap(household_id, UserOutcome::Failed(e.to_string()), latency_ms, None)
        }
    }
}

fn gap(
    household_id: HouseholdId,
    outcome: UserOutcome,
    latency_ms: f64,
    list: Option<RecommendationList>,
) -> UserEvaluation {
    UserEvaluation {
        household_id,
        outcome,
        latency_ms,
        list,
    }
}
