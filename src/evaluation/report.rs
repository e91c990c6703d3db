//! Per-algorithm aggregates and the cross-algorithm comparison report

use super::harness::{UserEvaluation, UserOutcome};
use super::metrics::UserMetrics;
use crate::error::Result;
use crate::matrix::{BuildSummary, Dataset};
use crate::types::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// Aggregate metrics for one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub algorithm: String,
    pub list_size: usize,

    pub hit_rate: f64,
    pub precision_at_n: f64,
    pub recall_at_n: f64,

    /// Distinct departments across every evaluated list
    pub department_diversity: usize,
    /// Department → recommendation slots
    pub department_distribution: BTreeMap<String, usize>,
    pub catalog_coverage: f64,
    pub mean_latency_ms: f64,

    pub eligible_users: usize,
    pub evaluated_users: usize,
    pub cold_start_users: usize,
    pub sparse_users: usize,
    pub timed_out_users: usize,
    pub failed_users: usize,
    /// evaluated / eligible
    pub user_coverage: f64,
}

impl EvaluationResult {
    /// Aggregate per-user outcomes.
    ///
    /// Accuracy and latency are means over `Evaluated` users only; every
    /// other outcome is counted in its own bucket and in `user_coverage`.
    pub fn aggregate(
        algorithm: &str,
        list_size: usize,
        users: &[UserEvaluation],
        dataset: &Dataset,
    ) -> Self {
        let mut result = Self {
            algorithm: algorithm.to_string(),
            list_size,
            hit_rate: 0.0,
            precision_at_n: 0.0,
            recall_at_n: 0.0,
            department_diversity: 0,
            department_distribution: BTreeMap::new(),
            catalog_coverage: 0.0,
            mean_latency_ms: 0.0,
            eligible_users: users.len(),
            evaluated_users: 0,
            cold_start_users: 0,
            sparse_users: 0,
            timed_out_users: 0,
            failed_users: 0,
            user_coverage: 0.0,
        };

        let mut evaluated: Vec<&UserMetrics> = Vec::new();
        let mut recommended: HashSet<ProductId> = HashSet::new();

        for user in users {
            match &user.outcome {
                UserOutcome::Evaluated(metrics) => {
                    evaluated.push(metrics);
                    if let Some(list) = &user.list {
                        for product_id in list.product_ids() {
                            recommended.insert(product_id);
                            if let Some(department) = dataset.features.department(product_id) {
                                *result
                                    .department_distribution
                                    .entry(department.to_string())
                                    .or_insert(0) += 1;
                            }
                        }
                    }
                }
                UserOutcome::ColdStart => result.cold_start_users += 1,
                UserOutcome::Sparse => result.sparse_users += 1,
                UserOutcome::TimedOut => result.timed_out_users += 1,
                UserOutcome::Failed(_) => result.failed_users += 1,
            }
        }

        result.evaluated_users = evaluated.len();
        if !evaluated.is_empty() {
            let count = evaluated.len() as f64;
            result.hit_rate = evaluated.iter().filter(|m| m.hit).count() as f64 / count;
            result.precision_at_n = evaluated.iter().map(|m| m.precision).sum::<f64>() / count;
            result.recall_at_n = evaluated.iter().map(|m| m.recall).sum::<f64>() / count;
            result.mean_latency_ms = evaluated.iter().map(|m| m.latency_ms).sum::<f64>() / count;
        }
        if result.eligible_users > 0 {
            result.user_coverage = result.evaluated_users as f64 / result.eligible_users as f64;
        }

        result.department_diversity = result.department_distribution.len();
        let catalog = dataset.catalog_size();
        if catalog > 0 {
            result.catalog_coverage = (recommended.len() as f64 / catalog as f64).min(1.0);
        }

        result
    }
}

/// Side-by-side results for every evaluated algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub list_size: usize,
    pub dataset: BuildSummary,
    /// Keyed by algorithm name
    pub results: BTreeMap<String, EvaluationResult>,
}

impl ComparisonReport {
    pub fn new(list_size: usize, dataset: BuildSummary) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            list_size,
            dataset,
            results: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, result: EvaluationResult) {
        self.results.insert(result.algorithm.clone(), result);
    }

    pub fn get(&self, algorithm: &str) -> Option<&EvaluationResult> {
        self.results.get(algorithm)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Plain-text comparison table
    pub fn render_table(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Run {} ({}), N = {}",
            self.run_id,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.list_size
        )?;
        writeln!(
            f,
            "{:<14} {:>8} {:>8} {:>8} {:>6} {:>9} {:>9} {:>11}",
            "algorithm", "hit", "prec@N", "rec@N", "depts", "catalog", "users", "latency_ms"
        )?;
        for result in self.results.values() {
            writeln!(
                f,
                "{:<14} {:>8.4} {:>8.4} {:>8.4} {:>6} {:>8.2}% {:>8.2}% {:>11.2}",
                result.algorithm,
                result.hit_rate,
                result.precision_at_n,
                result.recall_at_n,
                result.department_diversity,
                result.catalog_coverage * 100.0,
                result.user_coverage * 100.0,
                result.mean_latency_ms
            )?;
        }

        let mut gaps = self
            .results
            .values()
            .filter(|r| r.evaluated_users < r.eligible_users)
            .peekable();
        if gaps.peek().is_some() {
            writeln!(f, "\nCoverage gaps:")?;
        }
        for r in gaps {
            writeln!(
                f,
                "  {}: {} cold start, {} sparse, {} timed out, {} failed",
                r.algorithm, r.cold_start_users, r.sparse_users, r.timed_out_users, r.failed_users
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::matrix::MatrixBuilder;
    use crate::types::{ProductAttributes, RecommendationList, ScoredProduct, Transaction};

    fn dataset() -> Dataset {
        let products = vec![
            ProductAttributes::new(1, "GROCERY", "SOUP", "CANNED", "M1", "National"),
            ProductAttributes::new(2, "PRODUCE", "ONIONS", "SWEET", "M2", "Private"),
            ProductAttributes::new(3, "GROCERY", "SOUP", "DRY", "M1", "National"),
            ProductAttributes::new(4, "PRODUCE", "ONIONS", "RED", "M2", "Private"),
        ];
        let transactions = vec![Transaction::new(1, 1, 1, 1.0, 1.0)];
        MatrixBuilder::new(&EngineConfig::default())
            .build(&transactions, &products)
            .unwrap()
    }

    fn evaluated(household_id: u64, ids: &[u64], hit: bool) -> UserEvaluation {
        let list = RecommendationList::ranked(
            household_id,
            ids.iter().map(|&id| ScoredProduct::new(id, 1.0)),
            2,
        );
        let metrics = UserMetrics {
            household_id,
            hits: hit as usize,
            hit,
            precision: if hit { 0.5 } else { 0.0 },
            recall: if hit { 1.0 } else { 0.0 },
            latency_ms: 4.0,
        };
        UserEvaluation {
            household_id,
            outcome: UserOutcome::Evaluated(metrics),
            latency_ms: 4.0,
            list: Some(list),
        }
    }

    fn gap(household_id: u64, outcome: UserOutcome) -> UserEvaluation {
        UserEvaluation {
            household_id,
            outcome,
            latency_ms: 0.0,
            list: None,
        }
    }

    #[test]
    fn test_gaps_excluded_from_means_but_counted() {
        let users = vec![
            evaluated(1, &[2, 3], true),
            evaluated(2, &[2], false),
            gap(3, UserOutcome::ColdStart),
            gap(4, UserOutcome::TimedOut),
        ];
        let result = EvaluationResult::aggregate("user-user", 2, &users, &dataset());

        assert_eq!(result.eligible_users, 4);
        assert_eq!(result.evaluated_users, 2);
        assert_eq!(result.cold_start_users, 1);
        assert_eq!(result.timed_out_users, 1);
        assert_eq!(result.hit_rate, 0.5);
        assert_eq!(result.precision_at_n, 0.25);
        assert_eq!(result.recall_at_n, 0.5);
        assert_eq!(result.user_coverage, 0.5);
        assert_eq!(result.mean_latency_ms, 4.0);

        assert_eq!(result.department_diversity, 2);
        assert_eq!(result.department_distribution.get("PRODUCE"), Some(&2));
        assert_eq!(result.department_distribution.get("GROCERY"), Some(&1));
        assert_eq!(result.catalog_coverage, 0.5);
    }

    #[test]
    fn test_nobody_evaluated_gives_zero_metrics() {
        let users = vec![gap(1, UserOutcome::Sparse)];
        let result = EvaluationResult::aggregate("item-item", 10, &users, &dataset());
        assert_eq!(result.hit_rate, 0.0);
        assert_eq!(result.user_coverage, 0.0);
        assert_eq!(result.sparse_users, 1);
    }

    #[test]
    fn test_report_json_and_table() {
        let mut report = ComparisonReport::new(2, dataset().summary);
        let users = vec![evaluated(1, &[2], true), gap(2, UserOutcome::ColdStart)];
        report.insert(EvaluationResult::aggregate("content-based", 2, &users, &dataset()));

        let json = report.to_json().unwrap();
        let parsed: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.get("content-based").is_some());

        let table = report.render_table();
        assert!(table.contains("content-based"));
        assert!(table.contains("1 cold start"));
    }

    #[test]
    fn test_table_omits_gap_section_when_everyone_evaluated() {
        let mut report = ComparisonReport::new(2, dataset().summary);
        let users = vec![evaluated(1, &[2], true)];
        report.insert(EvaluationResult::aggregate("user-user", 2, &users, &dataset()));

        let table = report.render_table();
        assert_eq!(table, format!("{}", report));
        assert_eq!(table.lines().count(), 3);
        assert!(!table.contains("Coverage gaps"));
    }
}
