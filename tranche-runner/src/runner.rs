//! Run orchestration: config → portfolio → bars → engine → outcome.
//!
//! Two entry points:
//! - `run_from_config()`: loads bars per the `[data]` table, then replays. Used by the CLI.
//! - `run_with_series()`: takes pre-loaded series. No I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use tranche_core::data::ReplayFeed;
use tranche_core::domain::{Bar, Portfolio};
use tranche_core::engine::{Engine, RunReport};
use tranche_core::CoreError;

use crate::config::{ConfigError, RunConfig, RunOverrides};
use crate::data_loader::{compute_dataset_hash, load_bars, DataOrigin, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Complete result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub report: RunReport,
    pub dataset_hash: String,
    pub origin: DataOrigin,
    /// Total bars across all loaded series.
    pub bar_count: usize,
}

impl RunOutcome {
    pub fn is_synthetic(&self) -> bool {
        self.origin == DataOrigin::Synthetic
    }
}

/// One row of the flattened allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub symbol: String,
    pub capital: f64,
    /// Share of the starting balance, 0..=1.
    pub weight: f64,
}

/// Build the portfolio a config describes, honoring its duplicate policy.
pub fn build_portfolio(config: &RunConfig) -> Result<Portfolio, RunError> {
    let portfolio = Portfolio::with_duplicate_policy(
        config.run.initial_balance,
        &config.group_config(),
        config.run.duplicate_policy,
    )?;
    Ok(portfolio)
}

/// Flattened allocation table, in depth-first config order.
pub fn allocation_table(portfolio: &Portfolio) -> Vec<AllocationRow> {
    let balance = portfolio.balance();
    portfolio
        .flat_allocations()
        .iter()
        .map(|a| AllocationRow {
            symbol: a.symbol.clone(),
            capital: a.capital,
            weight: if balance > 0.0 { a.capital / balance } else { 0.0 },
        })
        .collect()
}

/// Apply overrides, load bars, and replay.
pub fn run_from_config(
    config: &RunConfig,
    overrides: &RunOverrides,
) -> Result<RunOutcome, RunError> {
    let config = config.clone().with_overrides(overrides)?;
    let portfolio = build_portfolio(&config)?;
    let loaded = load_bars(&portfolio.symbols(), &config.data)?;
    let bar_count = loaded.bar_count();

    let report = replay(&config, portfolio, loaded.series)?;
    Ok(RunOutcome {
        report,
        dataset_hash: loaded.dataset_hash,
        origin: loaded.origin,
        bar_count,
    })
}

/// Replay pre-loaded series under `config`. No I/O.
pub fn run_with_series(
    config: &RunConfig,
    series: Vec<(String, Vec<Bar>)>,
    origin: DataOrigin,
) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let portfolio = build_portfolio(config)?;
    let dataset_hash = compute_dataset_hash(&series);
    let bar_count = series.iter().map(|(_, bars)| bars.len()).sum();

    let report = replay(config, portfolio, series)?;
    Ok(RunOutcome {
        report,
        dataset_hash,
        origin,
        bar_count,
    })
}

fn replay(
    config: &RunConfig,
    portfolio: Portfolio,
    series: Vec<(String, Vec<Bar>)>,
) -> Result<RunReport, RunError> {
    let feed = ReplayFeed::new(series, config.data.alignment);
    info!(
        steps = feed.steps(),
        alignment = ?config.data.alignment,
        "feed ready"
    );
    let mut engine = Engine::new(portfolio, Box::new(feed), config.engine_config())?;
    Ok(engine.run()?)
}
