//! One-hot product feature space
//!
//! The category vocabulary is derived once from the full attribute table so
//! every split shares the same dimensionality. Each product row holds exactly
//! one `1.0` per categorical block.

use super::sparse::{SparseMatrix, SparseVec};
use crate::types::{ProductAttributes, ProductId, FEATURE_BLOCKS};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Sorted category values per block, laid out back to back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    blocks: Vec<IndexSet<String>>,
    offsets: Vec<usize>,
}

impl CategoryVocabulary {
    pub fn from_products(products: &[ProductAttributes]) -> Self {
        let mut blocks = Vec::with_capacity(FEATURE_BLOCKS.len());
        for block in 0..FEATURE_BLOCKS.len() {
            let mut values: Vec<&str> = products.iter().map(|p| p.categories()[block]).collect();
            values.sort_unstable();
            values.dedup();
            blocks.push(values.into_iter().map(str::to_string).collect::<IndexSet<_>>());
        }

        let mut offsets = Vec::with_capacity(blocks.len());
        let mut offset = 0;
        for block in &blocks {
            offsets.push(offset);
            offset += block.len();
        }

        Self { blocks, offsets }
    }

    /// Total feature dimensionality
    pub fn dimension(&self) -> usize {
        self.blocks.iter().map(IndexSet::len).sum()
    }

    pub fn block_len(&self, block: usize) -> usize {
        self.blocks.get(block).map(IndexSet::len).unwrap_or(0)
    }

    /// Global feature index of a category value
    pub fn feature_index(&self, block: usize, value: &str) -> Option<usize> {
        let local = self.blocks.get(block)?.get_index_of(value)?;
        Some(self.offsets[block] + local)
    }

    /// Category value behind a global feature index
    pub fn category(&self, feature: usize) -> Option<(&'static str, &str)> {
        let block = self.offsets.iter().rposition(|&o| o <= feature)?;
        let value = self.blocks[block].get_index(feature - self.offsets[block])?;
        Some((FEATURE_BLOCKS[block], value.as_str()))
    }

    /// Department name for a global feature index in the department block
    pub fn department(&self, feature: usize) -> Option<&str> {
        self.blocks.first()?.get_index(feature).map(String::as_str)
    }
}

/// Product id → one-hot vector over the category vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFeatureMatrix {
    vocabulary: CategoryVocabulary,
    products: IndexSet<ProductId>,
    matrix: SparseMatrix,
}

impl ProductFeatureMatrix {
    /// Encode `products` against `vocabulary`.
    ///
    /// Products whose values are all in the vocabulary are encoded; rows are
    /// in ascending product id order.
    pub fn encode(vocabulary: CategoryVocabulary, products: &[&ProductAttributes]) -> Self {
        let mut sorted: Vec<&ProductAttributes> = products.to_vec();
        sorted.sort_by_key(|p| p.product_id);
        sorted.dedup_by_key(|p| p.product_id);

        let mut ids = IndexSet::with_capacity(sorted.len());
        let mut triplets = Vec::with_capacity(sorted.len() * FEATURE_BLOCKS.len());
        for product in sorted {
            let features: Option<Vec<usize>> = product
                .categories()
                .iter()
                .enumerate()
                .map(|(block, value)| vocabulary.feature_index(block, value))
                .collect();
            if let Some(features) = features {
                let (row, _) = ids.insert_full(product.product_id);
                triplets.extend(features.into_iter().map(|f| (row, f, 1.0)));
            }
        }

        let matrix = SparseMatrix::from_triplets(ids.len(), vocabulary.dimension(), triplets);
        Self {
            vocabulary,
            products: ids,
            matrix,
        }
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    pub fn dimension(&self) -> usize {
        self.matrix.n_cols()
    }

    pub fn n_products(&self) -> usize {
        self.products.len()
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    /// Row index of a product
    pub fn index_of(&self, product_id: ProductId) -> Option<usize> {
        self.products.get_index_of(&product_id)
    }

    pub fn product_id(&self, row: usize) -> Option<ProductId> {
        self.products.get_index(row).copied()
    }

    pub fn vector(&self, product_id: ProductId) -> Option<SparseVec<'_>> {
        self.index_of(product_id).map(|row| self.matrix.row(row))
    }

    pub fn row(&self, row: usize) -> SparseVec<'_> {
        self.matrix.row(row)
    }

    /// Iterate `(product_id, vector)` in ascending product id order
    pub fn iter(&self) -> impl Iterator<Item = (ProductId, SparseVec<'_>)> + '_ {
        self.products
            .iter()
            .enumerate()
            .map(move |(row, &id)| (id, self.matrix.row(row)))
    }

    pub fn department(&self, product_id: ProductId) -> Option<&str> {
        let vector = self.vector(product_id)?;
        // Department block occupies the lowest feature indices
        let first = vector.indices.first().copied()? as usize;
        self.vocabulary.department(first)
    }
}
