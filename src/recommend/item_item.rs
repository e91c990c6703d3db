//! Item-item collaborative filtering with batched on-demand similarity
//!
//! Item similarity is never materialised for the whole catalog. For each
//! user, the top-M purchased products become source items, and candidate
//! items are scored batch by batch against those sources. A batch whose
//! estimated working set exceeds `max_batch_bytes` is skipped with a
//! warning; the other batches still contribute.
//!
//! Each candidate is scored entirely inside the batch that owns it, so the
//! merged result does not depend on the order batches are processed in.

use super::batches::{ItemBatch, ItemBatches};
use super::{Deadline, Recommender};
use crate::config::{Aggregation, ItemItemConfig};
use crate::error::{Result, ShelfwiseError};
use crate::matrix::{cosine_from_parts, Dataset, InteractionMatrix};
use crate::types::{HouseholdId, ProductId, RecommendationList, ScoredProduct, Shortfall};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::mem::size_of;
use std::sync::Arc;
use tracing::{debug, warn};

/// Column index → aggregated score for one batch
type PartialScores = HashMap<usize, f64>;

/// Bytes per stored nonzero of a candidate column (row index + value)
const BYTES_PER_NONZERO: usize = size_of::<u32>() + size_of::<f64>();

/// Source items of one recommendation, densified over households
struct Sources {
    columns: Vec<usize>,
    weights: Vec<f64>,
    norms: Vec<f64>,
    /// `dense[s][row]` is source `s`'s value for household row `row`
    dense: Vec<Vec<f64>>,
    purchased: HashSet<usize>,
}

pub struct ItemItemRecommender {
    dataset: Arc<Dataset>,
    config: ItemItemConfig,
    column_norms: Vec<f64>,
}

impl ItemItemRecommender {
    pub fn new(dataset: Arc<Dataset>, config: ItemItemConfig) -> Self {
        let matrix = dataset.train.matrix();
        let column_norms = (0..matrix.n_cols())
            .map(|c| matrix.column(c).norm())
            .collect();
        Self {
            dataset,
            config,
            column_norms,
        }
    }

    fn train(&self) -> &InteractionMatrix {
        &self.dataset.train
    }

    /// Batch partition of the train item space
    pub fn batches(&self) -> ItemBatches {
        ItemBatches::new(self.train().n_products(), self.config.batch_size)
    }

    /// Cosine similarity between two products' household columns
    pub fn item_similarity(&self, a: ProductId, b: ProductId) -> f64 {
        match (self.train().product_index(a), self.train().product_index(b)) {
            (Some(a), Some(b)) => {
                let matrix = self.train().matrix();
                cosine_from_parts(
                    matrix.column(a).dot(&matrix.column(b)),
                    self.column_norms[a],
                    self.column_norms[b],
                )
            }
            _ => 0.0,
        }
    }

    /// Estimated working set of scoring `batch` against `top_m_items` sources
    pub fn estimate_batch_bytes(&self, batch: &ItemBatch) -> usize {
        let matrix = self.train().matrix();
        let columns: usize = batch
            .items
            .clone()
            .map(|c| matrix.column(c).nnz() * BYTES_PER_NONZERO)
            .sum();
        columns + batch.len() * self.config.top_m_items * size_of::<f64>()
    }

    /// Rank candidates from `batches`, processed sequentially in the given order.
    ///
    /// `recommend` covers the same partition in parallel; this entry point
    /// lets callers choose the order or a subset.
    pub fn rank_from_batches(
        &self,
        household_id: HouseholdId,
        n: usize,
        batches: impl IntoIterator<Item = ItemBatch>,
        deadline: &Deadline,
    ) -> Result<RecommendationList> {
        let Some(sources) = self.sources(household_id) else {
            return Ok(RecommendationList::empty(household_id, Shortfall::ColdStart));
        };
        deadline.check(household_id)?;

        let mut scores = PartialScores::new();
        for batch in batches {
            let partial = self.score_batch_guarded(household_id, &batch, &sources, deadline)?;
            scores = self.merge(scores, partial);
        }
        Ok(self.finish(household_id, scores, n))
    }

    fn sources(&self, household_id: HouseholdId) -> Option<Sources> {
        let train = self.train();
        let row = train.user_index(household_id)?;
        let matrix = train.matrix();

        let top = train.top_purchases(household_id, self.config.top_m_items);
        let mut sources = Sources {
            columns: Vec::with_capacity(top.len()),
            weights: Vec::with_capacity(top.len()),
            norms: Vec::with_capacity(top.len()),
            dense: Vec::with_capacity(top.len()),
            purchased: matrix.row(row).iter().map(|(c, _)| c).collect(),
        };
        for (col, weight) in top {
            let mut dense = vec![0.0; train.n_users()];
            for (r, v) in matrix.column(col).iter() {
                dense[r] = v;
            }
            sources.columns.push(col);
            sources.weights.push(weight);
            sources.norms.push(self.column_norms[col]);
            sources.dense.push(dense);
        }
        Some(sources)
    }

    /// Score one batch; timeouts propagate, resource limits skip the batch
    fn score_batch_guarded(
        &self,
        household_id: HouseholdId,
        batch: &ItemBatch,
        sources: &Sources,
        deadline: &Deadline,
    ) -> Result<PartialScores> {
        deadline.check(household_id)?;
        match self.score_batch(batch, sources) {
            Err(err @ ShelfwiseError::ResourceLimit { .. }) => {
                warn!(household_id, batch = batch.index, "Skipping item batch: {}", err);
                Ok(PartialScores::new())
            }
            other => other,
        }
    }

    fn score_batch(&self, batch: &ItemBatch, sources: &Sources) -> Result<PartialScores> {
        let estimated_bytes = self.estimate_batch_bytes(batch);
        if estimated_bytes > self.config.max_batch_bytes {
            return Err(ShelfwiseError::ResourceLimit {
                batch: batch.index,
                estimated_bytes,
                limit_bytes: self.config.max_batch_bytes,
            });
        }

        let matrix = self.train().matrix();
        let mut scores = PartialScores::new();
        for item in batch.items.clone() {
            if sources.purchased.contains(&item) {
                continue;
            }
            let column = matrix.column(item);
            let mut score: Option<f64> = None;
            for s in 0..sources.columns.len() {
                let dot = column.dot_dense(&sources.dense[s]);
                let sim = cosine_from_parts(dot, self.column_norms[item], sources.norms[s]);
                let contribution = sim * sources.weights[s];
                score = Some(match score {
                    Some(acc) => self.combine(acc, contribution),
                    None => contribution,
                });
            }
            if let Some(score) = score.filter(|s| *s > 0.0) {
                scores.insert(item, score);
            }
        }
        debug!(
            batch = batch.index,
            candidates = scores.len(),
            "Scored item batch"
        );
        Ok(scores)
    }

    fn combine(&self, a: f64, b: f64) -> f64 {
        match self.config.aggregation {
            Aggregation::Sum => a + b,
            Aggregation::Max => a.max(b),
        }
    }

    /// Union of two partial score maps
    fn merge(&self, a: PartialScores, b: PartialScores) -> PartialScores {
        let (small, mut large) = if a.len() < b.len() { (a, b) } else { (b, a) };
        for (item, score) in small {
            large
                .entry(item)
                .and_modify(|existing| *existing = self.combine(*existing, score))
                .or_insert(score);
        }
        large
    }

    fn finish(&self, household_id: HouseholdId, scores: PartialScores, n: usize) -> RecommendationList {
        let candidates = scores.into_iter().filter_map(|(col, score)| {
            Some(ScoredProduct::new(self.train().product_id(col)?, score))
        });
        RecommendationList::ranked_or_sparse(household_id, candidates, n)
    }
}

impl Recommender for ItemItemRecommender {
    fn name(&self) -> &'static str {
        "item-item"
    }

    fn recommend(
        &self,
        household_id: HouseholdId,
        n: usize,
        deadline: &Deadline,
    ) -> Result<RecommendationList> {
        let Some(sources) = self.sources(household_id) else {
            return Ok(RecommendationList::empty(household_id, Shortfall::ColdStart));
        };
        deadline.check(household_id)?;

        let scores = self
            .batches()
            .iter()
            .par_bridge()
            .map(|batch| self.score_batch_guarded(household_id, &batch, &sources, deadline))
            .try_reduce(PartialScores::new, |a, b| Ok(self.merge(a, b)))?;

        Ok(self.finish(household_id, scores, n))
    }
}
