//! Tranche Runner — run configuration, bar loading, and orchestration.
//!
//! This crate builds on `tranche-core` to provide:
//! - TOML run files with CLI overrides
//! - Local CSV loading with a seeded synthetic fallback
//! - BLAKE3 dataset fingerprints
//! - Single-run orchestration

pub mod config;
pub mod data_loader;
pub mod runner;

pub use config::{ConfigError, DataSection, DataSource, RunConfig, RunOverrides, RunSection};
pub use data_loader::{load_bars, DataOrigin, LoadError, LoadedBars};
pub use runner::{
    allocation_table, build_portfolio, run_from_config, run_with_series, AllocationRow,
    RunError, RunOutcome,
};
