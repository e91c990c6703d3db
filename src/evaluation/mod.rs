//! Offline evaluation against held-out test purchases
//!
//! # Architecture
//!
//! - **EvaluationHarness**: runs one recommender over every test household
//!   concurrently and collects a `UserOutcome` per household
//! - **metrics**: hit, precision@N and recall@N for a single list
//! - **EvaluationResult**: per-algorithm means plus coverage counters
//! - **ComparisonReport**: results keyed by algorithm name, as JSON or a
//!   text table
//!
//! Cold-start, sparse, timed-out and failed users never enter the accuracy
//! means. They are counted separately and surface as `user_coverage`.

pub mod harness;
pub mod metrics;
pub mod report;

pub use harness::{AlgorithmEvaluation, EvaluationHarness, UserEvaluation, UserOutcome};
pub use metrics::{hits, precision_at_n, recall_at_n, UserMetrics};
pub use report::{ComparisonReport, EvaluationResult};
