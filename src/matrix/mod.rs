//! Sparse matrices built once per train/test split
//!
//! - **InteractionMatrix**: household x product aggregated sales value
//! - **ProductFeatureMatrix**: one-hot categorical attributes per product
//! - **MatrixBuilder**: records in, read-only `Dataset` out
//!
//! Recommenders only ever see these through `&` references.

pub mod builder;
pub mod features;
pub mod interaction;
pub mod similarity;
pub mod sparse;

pub use builder::{BuildSummary, Dataset, MatrixBuilder, MatrixStats};
pub use features::{CategoryVocabulary, ProductFeatureMatrix};
pub use interaction::InteractionMatrix;
pub use similarity::{cosine_from_parts, sparse_cosine, top_k};
pub use sparse::{SparseMatrix, SparseVec};
