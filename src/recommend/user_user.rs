//! User-user collaborative filtering
//!
//! Rows of the train matrix are mean-centred over each household's own
//! purchases, then compared by cosine similarity. The full household x
//! household similarity matrix is computed once at fit time.

use super::{Deadline, Recommender};
use crate::config::UserUserConfig;
use crate::error::Result;
use crate::matrix::{cosine_from_parts, top_k, Dataset, InteractionMatrix, SparseMatrix};
use crate::types::{HouseholdId, RecommendationList, ScoredProduct, Shortfall};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Dense symmetric household similarity matrix in row index space
#[derive(Debug, Clone, PartialEq)]
pub struct UserSimilarity {
    n: usize,
    values: Vec<f64>,
}

impl UserSimilarity {
    /// Pairwise cosine between the rows of `centered`.
    ///
    /// Dot products are accumulated through the column view, so each row
    /// only touches households that share at least one product with it.
    pub fn compute(centered: &SparseMatrix) -> Self {
        let n = centered.n_rows();
        let norms: Vec<f64> = (0..n).map(|r| centered.row(r).norm()).collect();
        let mut values = vec![0.0; n * n];

        values
            .par_chunks_mut(n.max(1))
            .enumerate()
            .for_each(|(u, out)| {
                for (item, cu) in centered.row(u).iter() {
                    if cu == 0.0 {
                        continue;
                    }
                    for (v, cv) in centered.column(item).iter() {
                        out[v] += cu * cv;
                    }
                }
                for (v, slot) in out.iter_mut().enumerate() {
                    *slot = cosine_from_parts(*slot, norms[u], norms[v]);
                }
            });

        // Mirror the upper triangle so sim(a, b) and sim(b, a) are bit-identical
        for a in 0..n {
            for b in (a + 1)..n {
                values[b * n + a] = values[a * n + b];
            }
        }

        Self { n, values }
    }

    pub fn n_users(&self) -> usize {
        self.n
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        if a >= self.n || b >= self.n {
            return 0.0;
        }
        self.values[a * self.n + b]
    }

    pub fn row(&self, a: usize) -> &[f64] {
        if a >= self.n {
            return &[];
        }
        &self.values[a * self.n..(a + 1) * self.n]
    }

    /// Up to `k` other rows with strictly positive similarity, best first
    pub fn neighbors(&self, a: usize, k: usize) -> Vec<(usize, f64)> {
        top_k(
            self.row(a)
                .iter()
                .copied()
                .enumerate()
                .filter(|&(b, sim)| b != a && sim > 0.0),
            k,
        )
    }
}

pub struct UserUserRecommender {
    dataset: Arc<Dataset>,
    config: UserUserConfig,
    centered: SparseMatrix,
    similarity: UserSimilarity,
}

impl UserUserRecommender {
    pub fn fit(dataset: Arc<Dataset>, config: UserUserConfig) -> Self {
        let started = Instant::now();
        let centered = dataset.train.matrix().mean_centered();
        let similarity = UserSimilarity::compute(&centered);
        info!(
            "Computed {}x{} household similarity matrix in {:.2?}",
            similarity.n_users(),
            similarity.n_users(),
            started.elapsed()
        );

        Self {
            dataset,
            config,
            centered,
            similarity,
        }
    }

    fn train(&self) -> &InteractionMatrix {
        &self.dataset.train
    }

    /// Similarity between two households; zero if either is unknown
    pub fn similarity(&self, a: HouseholdId, b: HouseholdId) -> f64 {
        match (self.train().user_index(a), self.train().user_index(b)) {
            (Some(a), Some(b)) => self.similarity.get(a, b),
            _ => 0.0,
        }
    }

    /// The household's positive-similarity neighbours as `(household_id, similarity)`
    pub fn neighbors(&self, household_id: HouseholdId) -> Vec<(HouseholdId, f64)> {
        let Some(row) = self.train().user_index(household_id) else {
            return Vec::new();
        };
        self.similarity
            .neighbors(row, self.config.neighbors)
            .into_iter()
            .filter_map(|(v, sim)| Some((self.train().household_id(v)?, sim)))
            .collect()
    }
}

impl Recommender for UserUserRecommender {
    fn name(&self) -> &'static str {
        "user-user"
    }

    fn recommend(
        &self,
        household_id: HouseholdId,
        n: usize,
        deadline: &Deadline,
    ) -> Result<RecommendationList> {
        let Some(row) = self.train().user_index(household_id) else {
            return Ok(RecommendationList::empty(household_id, Shortfall::ColdStart));
        };
        deadline.check(household_id)?;

        let neighbors = self.similarity.neighbors(row, self.config.neighbors);
        if neighbors.is_empty() {
            debug!(household_id, "No positively similar households");
            return Ok(RecommendationList::empty(household_id, Shortfall::ColdStart));
        }

        let seen: HashSet<usize> = self.centered.row(row).iter().map(|(c, _)| c).collect();
        let weight: f64 = neighbors.iter().map(|(_, sim)| sim).sum();

        // Neighbours are visited in rank order and columns ascending, so the
        // accumulation order per candidate is fixed
        let mut totals: BTreeMap<usize, f64> = BTreeMap::new();
        for &(neighbor, sim) in &neighbors {
            deadline.check(household_id)?;
            for (col, centered) in self.centered.row(neighbor).iter() {
                if !seen.contains(&col) {
                    *totals.entry(col).or_insert(0.0) += sim * centered;
                }
            }
        }

        let candidates = totals.into_iter().filter_map(|(col, total)| {
            Some(ScoredProduct::new(
                self.train().product_id(col)?,
                total / weight,
            ))
        });

        Ok(RecommendationList::ranked_or_sparse(household_id, candidates, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::matrix::MatrixBuilder;
    use crate::types::{ProductAttributes, Transaction};

    fn recommender(transactions: &[Transaction], k: usize) -> UserUserRecommender {
        let products: Vec<ProductAttributes> = (1..=6)
            .map(|id| ProductAttributes::new(id, "GROCERY", "SOUP", "CANNED", "M1", "National"))
            .collect();
        let dataset = MatrixBuilder::new(&EngineConfig::default())
            .build(transactions, &products)
            .unwrap();
        UserUserRecommender::fit(Arc::new(dataset), UserUserConfig { neighbors: k })
    }

    fn basket() -> Vec<Transaction> {
        vec![
            Transaction::new(1, 1, 2, 10.0, 1.0),
            Transaction::new(1, 2, 2, 5.0, 1.0),
            Transaction::new(2, 1, 3, 8.0, 1.0),
            Transaction::new(2, 2, 3, 2.0, 1.0),
            Transaction::new(2, 3, 3, 6.0, 1.0),
            Transaction::new(3, 2, 4, 9.0, 1.0),
            Transaction::new(3, 4, 4, 3.0, 1.0),
            Transaction::new(4, 4, 5, 4.0, 1.0),
            Transaction::new(4, 5, 5, 6.0, 1.0),
        ]
    }

    #[test]
    fn test_similarity_symmetric_and_bounded() {
        let r = recommender(&basket(), 20);
        for a in 1..=4 {
            for b in 1..=4 {
                let s = r.similarity(a, b);
                assert_eq!(s, r.similarity(b, a));
                assert!((-1.0..=1.0).contains(&s));
            }
        }
        // 15 / sqrt(12.5 * 56/3)
        let expected = 15.0 / (12.5f64 * 56.0 / 3.0).sqrt();
        assert!((r.similarity(1, 2) - expected).abs() < 1e-9);
        assert!(r.similarity(1, 3) < 0.0);
        assert_eq!(r.similarity(1, 4), 0.0);
    }

    #[test]
    fn test_neighbors_exclude_self_and_non_positive() {
        let r = recommender(&basket(), 20);
        let neighbors = r.neighbors(1);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].0, 2);
    }

    #[test]
    fn test_single_neighbor_weighted_average() {
        let r = recommender(&basket(), 1);
        let list = r.recommend(1, 2, &Deadline::none()).unwrap();

        assert_eq!(list.product_ids().collect::<Vec<_>>(), vec![3]);
        // Household 2 mean is 16/3, so P3 centres to 2/3
        assert!((list.items[0].score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_positive_neighbors_falls_back_to_cold_start() {
        // Opposite preferences over the same two products: similarity -1
        let r = recommender(
            &[
                Transaction::new(1, 1, 2, 10.0, 1.0),
                Transaction::new(1, 2, 2, 5.0, 1.0),
                Transaction::new(2, 1, 2, 5.0, 1.0),
                Transaction::new(2, 2, 2, 10.0, 1.0),
                Transaction::new(2, 3, 2, 7.5, 1.0),
            ],
            20,
        );
        assert!(r.similarity(1, 2) < 0.0);
        let list = r.recommend(1, 5, &Deadline::none()).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.shortfall, Some(Shortfall::ColdStart));
    }

    #[test]
    fn test_unknown_household_is_cold_start() {
        let r = recommender(&basket(), 20);
        let list = r.recommend(42, 5, &Deadline::none()).unwrap();
        assert_eq!(list.shortfall, Some(Shortfall::ColdStart));
    }

    #[test]
    fn test_neighbor_with_nothing_new_is_sparse() {
        let r = recommender(
            &[
                Transaction::new(1, 1, 2, 4.0, 1.0),
                Transaction::new(1, 2, 2, 1.0, 1.0),
                Transaction::new(2, 1, 2, 5.0, 1.0),
                Transaction::new(2, 2, 2, 2.0, 1.0),
            ],
            20,
        );
        let list = r.recommend(1, 5, &Deadline::none()).unwrap();
        assert_eq!(list.shortfall, Some(Shortfall::Sparsity));
    }
}
