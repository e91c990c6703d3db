//! End-to-end experiment: build → fit → evaluate → compare

use crate::config::EngineConfig;
use crate::error::{Result, ShelfwiseError};
use crate::evaluation::{ComparisonReport, EvaluationHarness};
use crate::matrix::{BuildSummary, Dataset, MatrixBuilder};
use crate::recommend::{build_recommender, Algorithm};
use crate::types::{ProductAttributes, RecommendationList, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct ExperimentOutput {
    pub summary: BuildSummary,
    pub report: ComparisonReport,
    /// Per-user lists keyed by algorithm name, in household order
    pub recommendations: BTreeMap<String, Vec<RecommendationList>>,
}

/// One configured comparison run
pub struct Experiment {
    config: Arc<EngineConfig>,
    algorithms: Vec<Algorithm>,
}

impl Experiment {
    /// Run every algorithm
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            algorithms: Algorithm::ALL.to_vec(),
        }
    }

    /// Restrict the run to `algorithms`, deduplicated, in canonical order
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        let mut selected: Vec<Algorithm> = algorithms.into_iter().collect();
        selected.sort();
        selected.dedup();
        self.algorithms = selected;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Build the matrices for `transactions` and `products`
    pub fn build(
        &self,
        transactions: &[Transaction],
        products: &[ProductAttributes],
    ) -> Result<Arc<Dataset>> {
        self.config.validate()?;
        Ok(Arc::new(
            MatrixBuilder::new(&self.config).build(transactions, products)?,
        ))
    }

    pub async fn run(
        &self,
        transactions: &[Transaction],
        products: &[ProductAttributes],
    ) -> Result<ExperimentOutput> {
        let dataset = self.build(transactions, products)?;
        self.run_on(dataset).await
    }

    /// Fit and evaluate every selected algorithm on an already built dataset
    pub async fn run_on(&self, dataset: Arc<Dataset>) -> Result<ExperimentOutput> {
        if self.algorithms.is_empty() {
            return Err(ShelfwiseError::InvalidOperation(
                "no algorithms selected".to_string(),
            ));
        }

        let started = Instant::now();
        let harness = EvaluationHarness::new(dataset.clone(), self.config.evaluation.clone());
        let mut report = ComparisonReport::new(self.config.evaluation.list_size, dataset.summary.clone());
        let mut recommendations = BTreeMap::new();

        for &algorithm in &self.algorithms {
            let fit_dataset = dataset.clone();
            let fit_config = self.config.clone();
            let recommender = tokio::task::spawn_blocking(move || {
                build_recommender(algorithm, fit_dataset, &fit_config)
            })
            .await
            .map_err(|e| ShelfwiseError::Other(format!("Async execution failed: {}", e)))?;

            let evaluation = harness.evaluate(recommender).await?;
            recommendations.insert(algorithm.to_string(), evaluation.recommendations());
            report.insert(evaluation.result);
        }

        info!(
            "Experiment {} finished in {:.2?}",
            report.run_id,
            started.elapsed()
        );

        Ok(ExperimentOutput {
            summary: dataset.summary.clone(),
            report,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_algorithms_dedups_in_canonical_order() {
        let experiment = Experiment::new(EngineConfig::default()).with_algorithms([
            Algorithm::ItemItem,
            Algorithm::ContentBased,
            Algorithm::ItemItem,
        ]);
        assert_eq!(
            experiment.algorithms(),
            &[Algorithm::ContentBased, Algorithm::ItemItem]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_rejected() {
        let experiment = Experiment::new(EngineConfig::default()).with_algorithms([]);
        let products = vec![ProductAttributes::new(1, "GROCERY", "SOUP", "CANNED", "M1", "National")];
        let transactions = vec![Transaction::new(1, 1, 1, 1.0, 1.0)];
        let err = experiment.run(&transactions, &products).await.unwrap_err();
        assert!(matches!(err, ShelfwiseError::InvalidOperation(_)));
    }
}
