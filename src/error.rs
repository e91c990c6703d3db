//! Error types for the Shelfwise recommendation engine
//!
//! Build-time integrity failures are fatal. Per-user and per-batch conditions
//! (cold start, sparsity, resource limits, timeouts) are recoverable and are
//! tallied by the evaluation harness instead of aborting a run.

use thiserror::Error;

/// Main error type for Shelfwise operations
#[derive(Error, Debug)]
pub enum ShelfwiseError {
    /// Malformed or cross-referentially inconsistent input records
    #[error("Data integrity error in {record}: {reason}")]
    DataIntegrity { record: String, reason: String },

    /// User has no usable history for this recommender
    #[error("Cold start: household {household_id} has no train history")]
    ColdStart { household_id: u64 },

    /// A neighbourhood or candidate set was empty after filtering
    #[error("Sparsity: household {household_id}: {reason}")]
    Sparsity { household_id: u64, reason: String },

    /// An item batch exceeded the configured memory bound
    #[error("Resource limit: batch {batch} needs ~{estimated_bytes} bytes (limit {limit_bytes})")]
    ResourceLimit {
        batch: usize,
        estimated_bytes: usize,
        limit_bytes: usize,
    },

    /// Per-user work exceeded its time budget
    #[error("Timeout: household {household_id} exceeded {budget_ms}ms")]
    Timeout { household_id: u64, budget_ms: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid operation (e.g., zero list size, unknown algorithm)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ShelfwiseError {
    /// Shorthand for a data integrity failure
    pub fn integrity(record: impl Into<String>, reason: impl Into<String>) -> Self {
        ShelfwiseError::DataIntegrity {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is isolated to one user or batch.
    ///
    /// Recoverable errors are counted in coverage statistics; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShelfwiseError::ColdStart { .. }
                | ShelfwiseError::Sparsity { .. }
                | ShelfwiseError::ResourceLimit { .. }
                | ShelfwiseError::Timeout { .. }
        )
    }
}

/// Result type alias for Shelfwise operations
pub type Result<T> = std::result::Result<T, ShelfwiseError>;

/// Convert anyhow::Error to ShelfwiseError
impl From<anyhow::Error> for ShelfwiseError {
    fn from(err: anyhow::Error) -> Self {
        ShelfwiseError::Other(err.to_string())
    }
}

impl From<toml::ser::Error> for ShelfwiseError {
    fn from(err: toml::ser::Error) -> Self {
        ShelfwiseError::Other(format!("Failed to serialize config: {}", err))
    }
}
