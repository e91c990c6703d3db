//! User-item interaction matrix keyed by household and product ids

use super::sparse::{SparseMatrix, SparseVec};
use crate::types::{HouseholdId, ProductId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated sales value per (household, product).
///
/// Rows and columns are in ascending id order. Every purchased pair is
/// stored, a zero-value purchase as an explicit 0.0 cell, so the row of a
/// household is exactly its purchase set; an absent pair means no
/// interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    users: IndexSet<HouseholdId>,
    products: IndexSet<ProductId>,
    matrix: SparseMatrix,
}

impl InteractionMatrix {
    /// Build from already-aggregated cell values.
    ///
    /// Zero cells are kept as recorded purchases; negative or non-finite
    /// values are dropped.
    pub fn from_aggregates(cells: HashMap<(HouseholdId, ProductId), f64>) -> Self {
        let kept: Vec<((HouseholdId, ProductId), f64)> = cells
            .into_iter()
            .filter(|(_, v)| v.is_finite() && *v >= 0.0)
            .collect();

        let mut user_ids: Vec<HouseholdId> = kept.iter().map(|((u, _), _)| *u).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut product_ids: Vec<ProductId> = kept.iter().map(|((_, p), _)| *p).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let users: IndexSet<HouseholdId> = user_ids.into_iter().collect();
        let products: IndexSet<ProductId> = product_ids.into_iter().collect();

        let triplets = kept
            .into_iter()
            .filter_map(|((u, p), v)| {
                Some((users.get_index_of(&u)?, products.get_index_of(&p)?, v))
            })
            .collect();
        let matrix = SparseMatrix::from_recorded_triplets(users.len(), products.len(), triplets);

        Self {
            users,
            products,
            matrix,
        }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_products(&self) -> usize {
        self.products.len()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn sparsity(&self) -> f64 {
        self.matrix.sparsity()
    }

    /// Underlying index-space matrix
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    pub fn contains_user(&self, household_id: HouseholdId) -> bool {
        self.users.contains(&household_id)
    }

    pub fn user_index(&self, household_id: HouseholdId) -> Option<usize> {
        self.users.get_index_of(&household_id)
    }

    pub fn product_index(&self, product_id: ProductId) -> Option<usize> {
        self.products.get_index_of(&product_id)
    }

    pub fn household_id(&self, row: usize) -> Option<HouseholdId> {
        self.users.get_index(row).copied()
    }

    pub fn product_id(&self, col: usize) -> Option<ProductId> {
        self.products.get_index(col).copied()
    }

    /// Household ids in ascending order
    pub fn households(&self) -> impl Iterator<Item = HouseholdId> + '_ {
        self.users.iter().copied()
    }

    /// Product ids in ascending order
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.products.iter().copied()
    }

    /// A household's row; empty when the household is unknown
    pub fn user_row(&self, household_id: HouseholdId) -> SparseVec<'_> {
        match self.user_index(household_id) {
            Some(row) => self.matrix.row(row),
            None => SparseVec::empty(),
        }
    }

    /// A product's column over households; empty when the product is unknown
    pub fn item_column(&self, product_id: ProductId) -> SparseVec<'_> {
        match self.product_index(product_id) {
            Some(col) => self.matrix.column(col),
            None => SparseVec::empty(),
        }
    }

    pub fn value(&self, household_id: HouseholdId, product_id: ProductId) -> f64 {
        match (self.user_index(household_id), self.product_index(product_id)) {
            (Some(r), Some(c)) => self.matrix.get(r, c),
            _ => 0.0,
        }
    }

    /// `(product_id, value)` pairs a household purchased, ascending product id
    pub fn purchases(&self, household_id: HouseholdId) -> Vec<(ProductId, f64)> {
        self.user_row(household_id)
            .iter()
            .filter_map(|(col, v)| Some((self.product_id(col)?, v)))
            .collect()
    }

    /// The household's `k` largest purchases as `(column, value)`.
    ///
    /// Ordered by value descending, then product id ascending.
    pub fn top_purchases(&self, household_id: HouseholdId, k: usize) -> Vec<(usize, f64)> {
        super::similarity::top_k(self.user_row(household_id).iter(), k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InteractionMatrix {
        let mut cells = HashMap::new();
        cells.insert((7, 300), 3.0);
        cells.insert((7, 100), 10.0);
        cells.insert((2, 200), 5.0);
        cells.insert((2, 300), 0.0);
        cells.insert((9, 100), 10.0);
        cells.insert((9, 400), -1.0);
        InteractionMatrix::from_aggregates(cells)
    }

    #[test]
    fn test_ids_sorted_and_zero_value_purchases_kept() {
        let m = sample();
        assert_eq!(m.households().collect::<Vec<_>>(), vec![2, 7, 9]);
        assert_eq!(m.product_ids().collect::<Vec<_>>(), vec![100, 200, 300]);
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.value(2, 300), 0.0);
        assert_eq!(m.purchases(2), vec![(200, 5.0), (300, 0.0)]);
        assert_eq!(m.value(7, 100), 10.0);
        assert_eq!(m.value(42, 100), 0.0);
    }

    #[test]
    fn test_purchases_and_columns() {
        let m = sample();
        assert_eq!(m.purchases(7), vec![(100, 10.0), (300, 3.0)]);
        assert!(m.purchases(42).is_empty());

        let column = m.item_column(100);
        let holders: Vec<_> = column
            .iter()
            .filter_map(|(row, _)| m.household_id(row))
            .collect();
        assert_eq!(holders, vec![7, 9]);
    }

    #[test]
    fn test_top_purchases_order() {
        let m = sample();
        let top = m.top_purchases(7, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(m.product_id(top[0].0), Some(100));
        assert_eq!(m.top_purchases(7, 10).len(), 2);
    }
}
