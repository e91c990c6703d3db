//! Core data types for the Shelfwise recommendation engine
//!
//! Input records (`Transaction`, `ProductAttributes`) are validated at the
//! ingestion boundary. Output records (`RecommendationList`) are created per
//! user on demand and discarded after evaluation.

use crate::error::{Result, ShelfwiseError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Household (user) identifier
pub type HouseholdId = u64;

/// Product (item) identifier
pub type ProductId = u64;

/// Week number, 1-based
pub type Week = u32;

/// One line of a household purchase
///
/// Field names follow the retail transaction export; unrelated columns
/// (basket, store, discounts) are ignored on ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "household_key", alias = "household_id")]
    pub household_id: HouseholdId,

    #[serde(rename = "PRODUCT_ID", alias = "product_id")]
    pub product_id: ProductId,

    #[serde(rename = "WEEK_NO", alias = "week")]
    pub week: Week,

    #[serde(rename = "SALES_VALUE", alias = "sales_value")]
    pub sales_value: f64,

    #[serde(rename = "QUANTITY", alias = "quantity")]
    pub quantity: f64,
}

impl Transaction {
    pub fn new(
        household_id: HouseholdId,
        product_id: ProductId,
        week: Week,
        sales_value: f64,
        quantity: f64,
    ) -> Self {
        Self {
            household_id,
            product_id,
            week,
            sales_value,
            quantity,
        }
    }

    /// Reject records that would break the non-negativity invariant
    pub fn validate(&self) -> Result<()> {
        let record = || {
            format!(
                "transaction (household {}, product {}, week {})",
                self.household_id, self.product_id, self.week
            )
        };

        if self.week == 0 {
            return Err(ShelfwiseError::integrity(record(), "week numbers start at 1"));
        }
        if !self.sales_value.is_finite() || self.sales_value < 0.0 {
            return Err(ShelfwiseError::integrity(
                record(),
                format!("sales_value must be finite and >= 0, got {}", self.sales_value),
            ));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(ShelfwiseError::integrity(
                record(),
                format!("quantity must be finite and >= 0, got {}", self.quantity),
            ));
        }
        Ok(())
    }
}

/// Categorical attributes of one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributes {
    #[serde(rename = "PRODUCT_ID", alias = "product_id")]
    pub product_id: ProductId,

    #[serde(rename = "DEPARTMENT", alias = "department")]
    pub department: String,

    #[serde(rename = "COMMODITY_DESC", alias = "commodity")]
    pub commodity: String,

    #[serde(rename = "SUB_COMMODITY_DESC", alias = "subcommodity")]
    pub subcommodity: String,

    #[serde(rename = "MANUFACTURER", alias = "manufacturer")]
    pub manufacturer: String,

    #[serde(rename = "BRAND", alias = "brand")]
    pub brand: String,
}

impl ProductAttributes {
    pub fn new(
        product_id: ProductId,
        department: impl Into<String>,
        commodity: impl Into<String>,
        subcommodity: impl Into<String>,
        manufacturer: impl Into<String>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            department: department.into(),
            commodity: commodity.into(),
            subcommodity: subcommodity.into(),
            manufacturer: manufacturer.into(),
            brand: brand.into(),
        }
    }

    /// The five categorical blocks, in feature-space order
    pub fn categories(&self) -> [&str; 5] {
        [
            self.department.as_str(),
            self.commodity.as_str(),
            self.subcommodity.as_str(),
            self.manufacturer.as_str(),
            self.brand.as_str(),
        ]
    }

    /// Every block must carry a value so each one-hot block sums to 1
    pub fn validate(&self) -> Result<()> {
        for (block, value) in FEATURE_BLOCKS.iter().zip(self.categories()) {
            if value.trim().is_empty() {
                return Err(ShelfwiseError::integrity(
                    format!("product {}", self.product_id),
                    format!("missing {}", block),
                ));
            }
        }
        Ok(())
    }
}

/// Names of the categorical blocks of the product feature space
pub const FEATURE_BLOCKS: [&str; 5] = [
    "department",
    "commodity",
    "subcommodity",
    "manufacturer",
    "brand",
];

/// A product with its recommendation score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product_id: ProductId,
    pub score: f64,
}

impl ScoredProduct {
    pub fn new(product_id: ProductId, score: f64) -> Self {
        Self { product_id, score }
    }

    /// Ranking order: score descending, then product id ascending
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.product_id.cmp(&other.product_id))
    }
}

/// Why a recommender returned an empty list instead of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortfall {
    /// No train history for the user
    ColdStart,
    /// History exists but yields no usable neighbours or candidates
    Sparsity,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shortfall::ColdStart => write!(f, "cold_start"),
            Shortfall::Sparsity => write!(f, "sparsity"),
        }
    }
}

/// Ranked recommendations for one household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub household_id: HouseholdId,
    pub items: Vec<ScoredProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
}

impl RecommendationList {
    /// Rank `candidates` into a list of at most `n` items.
    ///
    /// Non-finite scores are dropped; ties are broken by product id.
    pub fn ranked(
        household_id: HouseholdId,
        candidates: impl IntoIterator<Item = ScoredProduct>,
        n: usize,
    ) -> Self {
        let mut items: Vec<ScoredProduct> = candidates
            .into_iter()
            .filter(|c| c.score.is_finite())
            .collect();
        items.sort_by(ScoredProduct::rank_cmp);
        items.truncate(n);

        Self {
            household_id,
            items,
            shortfall: None,
        }
    }

    /// Empty list tagged with the reason
    pub fn empty(household_id: HouseholdId, shortfall: Shortfall) -> Self {
        Self {
            household_id,
            items: Vec::new(),
            shortfall: Some(shortfall),
        }
    }

    /// Ranked list that degrades to `Sparsity` when no candidate survived
    pub fn ranked_or_sparse(
        household_id: HouseholdId,
        candidates: impl IntoIterator<Item = ScoredProduct>,
        n: usize,
    ) -> Self {
        let list = Self::ranked(household_id, candidates, n);
        if list.items.is_empty() {
            Self::empty(household_id, Shortfall::Sparsity)
        } else {
            list
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(|i| i.product_id)
    }
}
