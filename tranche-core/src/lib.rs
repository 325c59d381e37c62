//! Tranche Core — hierarchical capital allocation and position accounting.
//!
//! This crate contains:
//! - Domain types (bars, instruments, groups, portfolio, positions)
//! - The flat allocation derived from a nested group configuration
//! - Per-symbol weighted-average-cost ledgers and the executor that owns them
//! - The bar feed contract and an in-memory replay feed
//! - The replay engine that deploys capital and marks positions

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod strategy;

pub use error::{AccountingError, ConfigError, CoreError};
