//! Matrix construction from typed records
//!
//! Splits transactions on the configured week boundary, aggregates sales
//! value per (household, product) within each split, and one-hot encodes
//! the attribute table. The returned `Dataset` is read-only from here on.

use super::features::{CategoryVocabulary, ProductFeatureMatrix};
use super::interaction::InteractionMatrix;
use crate::config::{EngineConfig, IntegrityPolicy, SplitConfig, Window};
use crate::error::{Result, ShelfwiseError};
use crate::types::{HouseholdId, ProductAttributes, ProductId, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// How many offending ids to name in an integrity error
const REPORTED_UNKNOWN_IDS: usize = 5;

/// Matrices for one train/test split
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: InteractionMatrix,
    /// Held out; only the evaluation harness reads it
    pub test: InteractionMatrix,
    pub features: ProductFeatureMatrix,
    pub summary: BuildSummary,
}

impl Dataset {
    /// Products known to either the train matrix or the feature matrix
    pub fn catalog_size(&self) -> usize {
        let train_only = self
            .train
            .product_ids()
            .filter(|id| !self.features.contains(*id))
            .count();
        self.features.n_products() + train_only
    }
}

/// Shape statistics for one interaction matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixStats {
    pub users: usize,
    pub products: usize,
    pub nonzeros: usize,
    pub sparsity: f64,
}

impl From<&InteractionMatrix> for MatrixStats {
    fn from(m: &InteractionMatrix) -> Self {
        Self {
            users: m.n_users(),
            products: m.n_products(),
            nonzeros: m.nnz(),
            sparsity: m.sparsity(),
        }
    }
}

/// What the build saw and produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub train: MatrixStats,
    pub test: MatrixStats,
    pub feature_products: usize,
    pub feature_dimension: usize,
    /// Transactions outside both windows
    pub ignored_transactions: usize,
    /// Products referenced by transactions but missing from the attribute table
    pub unknown_products: Vec<ProductId>,
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "train: {} users x {} products, {} nonzeros ({:.2}% sparse)",
            self.train.users,
            self.train.products,
            self.train.nonzeros,
            self.train.sparsity * 100.0
        )?;
        writeln!(
            f,
            "test:  {} users x {} products, {} nonzeros ({:.2}% sparse)",
            self.test.users,
            self.test.products,
            self.test.nonzeros,
            self.test.sparsity * 100.0
        )?;
        writeln!(
            f,
            "features: {} products x {} dimensions",
            self.feature_products, self.feature_dimension
        )?;
        write!(
            f,
            "ignored transactions: {}, unknown products: {}",
            self.ignored_transactions,
            self.unknown_products.len()
        )
    }
}

/// Builds the interaction and feature matrices
pub struct MatrixBuilder {
    split: SplitConfig,
    policy: IntegrityPolicy,
}

impl MatrixBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            split: config.split.clone(),
            policy: config.integrity.policy,
        }
    }

    /// Build train/test interaction matrices and the product feature matrix
    pub fn build(
        &self,
        transactions: &[Transaction],
        products: &[ProductAttributes],
    ) -> Result<Dataset> {
        let mut catalog: HashMap<ProductId, &ProductAttributes> =
            HashMap::with_capacity(products.len());
        for product in products {
            product.validate()?;
            if catalog.insert(product.product_id, product).is_some() {
                return Err(ShelfwiseError::integrity(
                    format!("product {}", product.product_id),
                    "duplicate product id in attribute table",
                ));
            }
        }

        let mut train_cells: HashMap<(HouseholdId, ProductId), f64> = HashMap::new();
        let mut test_cells: HashMap<(HouseholdId, ProductId), f64> = HashMap::new();
        let mut unknown: BTreeSet<ProductId> = BTreeSet::new();
        let mut ignored = 0usize;

        for transaction in transactions {
            transaction.validate()?;

            let cells = match self.split.window(transaction.week) {
                Window::Train => &mut train_cells,
                Window::Test => &mut test_cells,
                Window::Outside => {
                    ignored += 1;
                    continue;
                }
            };

            if !catalog.contains_key(&transaction.product_id) {
                unknown.insert(transaction.product_id);
            }

            *cells
                .entry((transaction.household_id, transaction.product_id))
                .or_insert(0.0) += transaction.sales_value;
        }

        let unknown: Vec<ProductId> = unknown.into_iter().collect();
        if !unknown.is_empty() {
            self.handle_unknown_products(&unknown)?;
        }

        // Vocabulary comes from the full table so both splits share one space
        let vocabulary = CategoryVocabulary::from_products(products);
        let encoded: Vec<&ProductAttributes> = catalog.values().copied().collect();
        let features = ProductFeatureMatrix::encode(vocabulary, &encoded);

        let train = InteractionMatrix::from_aggregates(train_cells);
        let test = InteractionMatrix::from_aggregates(test_cells);

        let summary = BuildSummary {
            train: MatrixStats::from(&train),
            test: MatrixStats::from(&test),
            feature_products: features.n_products(),
            feature_dimension: features.dimension(),
            ignored_transactions: ignored,
            unknown_products: unknown,
        };

        info!(
            "Built train matrix: {} users x {} products ({:.2}% sparse)",
            summary.train.users,
            summary.train.products,
            summary.train.sparsity * 100.0
        );
        info!(
            "Built test matrix: {} users x {} products",
            summary.test.users, summary.test.products
        );
        debug!(
            "Feature matrix: {} products x {} dimensions, {} transactions ignored",
            summary.feature_products, summary.feature_dimension, summary.ignored_transactions
        );

        Ok(Dataset {
            train,
            test,
            features,
            summary,
        })
    }

    fn handle_unknown_products(&self, unknown: &[ProductId]) -> Result<()> {
        let named: Vec<String> = unknown
            .iter()
            .take(REPORTED_UNKNOWN_IDS)
            .map(|id| id.to_string())
            .collect();

        match self.policy {
            IntegrityPolicy::Strict => Err(ShelfwiseError::integrity(
                "transactions",
                format!(
                    "{} product(s) missing from attribute table (first: {})",
                    unknown.len(),
                    named.join(", ")
                ),
            )),
            IntegrityPolicy::Lenient => {
                warn!(
                    unknown_products = unknown.len(),
                    "Products missing from attribute table kept in interactions, excluded from features: {}",
                    named.join(", ")
                );
                Ok(())
            }
        }
    }
}
