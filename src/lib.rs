//! Shelfwise - Batch Retail Recommendation Engine
//!
//! Builds sparse interaction and product feature matrices from household
//! transactions, runs three recommenders over them, and evaluates each
//! against held-out test purchases:
//! - Content-based filtering over one-hot product attributes
//! - User-user collaborative filtering on mean-centred purchase values
//! - Item-item collaborative filtering with batched, memory-bounded similarity
//!
//! # Architecture
//!
//! - **Ingest**: CSV records into typed `Transaction` / `ProductAttributes`
//! - **Matrix**: train/test `InteractionMatrix` and `ProductFeatureMatrix`
//! - **Recommend**: the `Recommender` trait and its three implementations
//! - **Evaluation**: concurrent per-user harness and comparison report
//! - **Orchestrator**: build → fit → evaluate → compare
//!
//! # Example
//!
//! ```ignore
//! use shelfwise_core::{EngineConfig, Experiment, ingest};
//!
//! #[tokio::main]
//! async fn main() -> shelfwise_core::Result<()> {
//!     let transactions = ingest::load_transactions("transaction_data.csv".as_ref())?;
//!     let products = ingest::load_products("product.csv".as_ref())?;
//!
//!     let output = Experiment::new(EngineConfig::default())
//!         .run(&transactions, &products)
//!         .await?;
//!     println!("{}", output.report.render_table());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod ingest;
pub mod matrix;
pub mod orchestrator;
pub mod recommend;
pub mod types;

// Re-export commonly used types
pub use config::{Aggregation, EngineConfig, IntegrityPolicy};
pub use error::{Result, ShelfwiseError};
pub use evaluation::{ComparisonReport, EvaluationHarness, EvaluationResult, UserOutcome};
pub use matrix::{Dataset, InteractionMatrix, MatrixBuilder, ProductFeatureMatrix};
pub use orchestrator::{Experiment, ExperimentOutput};
pub use recommend::{
    build_recommender, Algorithm, ContentBasedRecommender, Deadline, ItemItemRecommender,
    Recommender, UserUserRecommender,
};
pub use types::{
    HouseholdId, ProductAttributes, ProductId, RecommendationList, ScoredProduct, Shortfall,
    Transaction,
};
