//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod config;
pub mod evaluate;
pub mod helpers;
pub mod recommend;
pub mod stats;
