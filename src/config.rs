//! Engine configuration
//!
//! A single immutable `EngineConfig` is built once per run and shared by
//! reference with every component.
//!
//! # Configuration File Format
//!
//! TOML, every key optional:
//!
//! ```toml
//! [split]
//! train_start_week = 1
//! train_end_week = 21
//! test_end_week = 26
//!
//! [content]
//! top_k_purchases = 20
//!
//! [user_user]
//! neighbors = 20
//!
//! [item_item]
//! top_m_items = 5
//! batch_size = 5000
//! aggregation = "sum"
//! max_batch_bytes = 268435456
//!
//! [evaluation]
//! list_size = 10
//! workers = 8
//! per_user_timeout_ms = 60000
//!
//! [integrity]
//! policy = "strict"
//! ```
//!
//! Environment variables prefixed `SHELFWISE__` override file values, with
//! `__` separating section and key (`SHELFWISE__EVALUATION__LIST_SIZE=20`).

use crate::error::{Result, ShelfwiseError};
use crate::types::Week;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub user_user: UserUserConfig,

    #[serde(default)]
    pub item_item: ItemItemConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub integrity: IntegrityConfig,
}

/// Train/test week boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_train_start_week")]
    pub train_start_week: Week,

    /// Last week (inclusive) of the train window
    #[serde(default = "default_train_end_week")]
    pub train_end_week: Week,

    /// Last week (inclusive) of the test window
    #[serde(default = "default_test_end_week")]
    pub test_end_week: Week,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_start_week: default_train_start_week(),
            train_end_week: default_train_end_week(),
            test_end_week: default_test_end_week(),
        }
    }
}

/// Which window a week falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Train,
    Test,
    Outside,
}

impl SplitConfig {
    pub fn window(&self, week: Week) -> Window {
        if week >= self.train_start_week && week <= self.train_end_week {
            Window::Train
        } else if week > self.train_end_week && week <= self.test_end_week {
            Window::Test
        } else {
            Window::Outside
        }
    }
}

/// Content-based recommender settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Purchases (by sales value) used to build the user profile
    #[serde(default = "default_top_k_purchases")]
    pub top_k_purchases: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            top_k_purchases: default_top_k_purchases(),
        }
    }
}

/// User-user collaborative filtering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUserConfig {
    /// Neighbourhood size k
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for UserUserConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
        }
    }
}

/// How a candidate's contributions from several source items combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Sum of weighted similarities; rewards candidates close to many sources
    #[default]
    Sum,
    /// Strongest single weighted similarity
    Max,
}

/// Item-item collaborative filtering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemItemConfig {
    /// Source items taken from the user's purchases
    #[serde(default = "default_top_m_items")]
    pub top_m_items: usize,

    /// Items per similarity batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub aggregation: Aggregation,

    /// Working-set bound for one batch
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
}

impl Default for ItemItemConfig {
    fn default() -> Self {
        Self {
            top_m_items: default_top_m_items(),
            batch_size: default_batch_size(),
            aggregation: Aggregation::default(),
            max_batch_bytes: default_max_batch_bytes(),
        }
    }
}

/// Evaluation harness settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Recommendation list size N
    #[serde(default = "default_list_size")]
    pub list_size: usize,

    /// Concurrent per-user workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_per_user_timeout_ms")]
    pub per_user_timeout_ms: u64,

    /// Evaluate only the first `max_users` test households (ascending id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_users: Option<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            list_size: default_list_size(),
            workers: default_workers(),
            per_user_timeout_ms: default_per_user_timeout_ms(),
            max_users: None,
        }
    }
}

impl EvaluationConfig {
    pub fn per_user_timeout(&self) -> Duration {
        Duration::from_millis(self.per_user_timeout_ms)
    }
}

/// Handling of transactions that reference unknown products
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Abort the build
    #[default]
    Strict,
    /// Keep the interactions, exclude the products from the feature matrix, warn
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityConfig {
    #[serde(default)]
    pub policy: IntegrityPolicy,
}

// Default value helpers
fn default_train_start_week() -> Week {
    1
}

fn default_train_end_week() -> Week {
    21
}

fn default_test_end_week() -> Week {
    26
}

fn default_top_k_purchases() -> usize {
    20
}

fn default_neighbors() -> usize {
    20
}

fn default_top_m_items() -> usize {
    5
}

fn default_batch_size() -> usize {
    5_000
}

fn default_max_batch_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_list_size() -> usize {
    10
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_per_user_timeout_ms() -> u64 {
    60_000
}

impl EngineConfig {
    /// Load configuration: defaults, then optional TOML file, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
                tracing::info!("Loading configuration from {:?}", path);
            } else {
                tracing::info!("Config file not found, using defaults: {:?}", path);
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SHELFWISE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        let split = &self.split;
        if split.train_start_week == 0 {
            return invalid("split.train_start_week must be >= 1");
        }
        if split.train_end_week < split.train_start_week {
            return invalid("split.train_end_week precedes split.train_start_week");
        }
        if split.test_end_week <= split.train_end_week {
            return invalid("split.test_end_week must be after split.train_end_week");
        }
        if self.content.top_k_purchases == 0 {
            return invalid("content.top_k_purchases must be > 0");
        }
        if self.user_user.neighbors == 0 {
            return invalid("user_user.neighbors must be > 0");
        }
        if self.item_item.top_m_items == 0 {
            return invalid("item_item.top_m_items must be > 0");
        }
        if self.item_item.batch_size == 0 {
            return invalid("item_item.batch_size must be > 0");
        }
        if self.evaluation.list_size == 0 {
            return invalid("evaluation.list_size must be > 0");
        }
        if self.evaluation.workers == 0 {
            return invalid("evaluation.workers must be > 0");
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(ShelfwiseError::InvalidOperation(message.to_string()))
}
