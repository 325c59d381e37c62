use super::executor::Executor;
use super::state::{EngineConfig, RunReport, Valuation};
use crate::data::BarFeed;
use crate::domain::{Bar, Portfolio};
use crate::error::{AccountingError, ConfigError, CoreError};
use crate::strategy::{NoOpStrategy, Strategy};
use std::collections::HashSet;
use tracing::{debug, info};

/// Bar-by-bar replay driver.
///
/// The first bar seen for a symbol deploys that symbol's whole allocation as
/// a single market buy at the bar's close. Every later bar only marks the
/// position. The engine is the sole writer of its executor.
pub struct Engine {
    portfolio: Portfolio,
    executor: Executor,
    feed: Box<dyn BarFeed>,
    strategy: Box<dyn Strategy>,
    config: EngineConfig,
    deployed: HashSet<String>,
    steps: usize,
}

impl Engine {
    /// Wire a portfolio to a feed. Fails if any allocated symbol has no
    /// series in the feed.
    pub fn new(
        portfolio: Portfolio,
        feed: Box<dyn BarFeed>,
        config: EngineConfig,
    ) -> Result<Self, CoreError> {
        if let Some(missing) = portfolio
            .symbols()
            .into_iter()
            .find(|symbol| !feed.contains(symbol))
        {
            return Err(ConfigError::SymbolMissingFromFeed {
                symbol: missing.to_string(),
            }
            .into());
        }

        Ok(Self {
            portfolio,
            executor: Executor::with_flip_policy(config.flip_policy),
            feed,
            strategy: Box::new(NoOpStrategy),
            config,
            deployed: HashSet::new(),
            steps: 0,
        })
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replay the feed to exhaustion (or `max_steps`) and report.
    pub fn run(&mut self) -> Result<RunReport, CoreError> {
        info!(
            symbols = self.portfolio.flat_allocations().len(),
            balance = self.portfolio.balance(),
            strategy = self.strategy.name(),
            "replay started"
        );

        let mut stopped_early = false;
        while self.feed.has_next() {
            if self.config.max_steps.is_some_and(|max| self.steps >= max) {
                stopped_early = true;
                break;
            }
            self.step()?;
        }

        let report = self.report(stopped_early);
        info!(
            steps = report.steps,
            deployed = report.deployed,
            final_value = report.final_value,
            stopped_early,
            "replay finished"
        );
        Ok(report)
    }

    /// Consume one row from the feed. Returns false once the feed is exhausted.
    pub fn step(&mut self) -> Result<bool, CoreError> {
        if !self.feed.has_next() {
            return Ok(false);
        }
        let row = self.feed.next_row();
        for (symbol, bar) in row.iter() {
            let Some(bar) = bar else { continue };
            if self.deployed.contains(symbol) {
                self.executor.mark_market_price(symbol, bar.close)?;
                self.strategy.on_tick(symbol, bar);
            } else {
                self.deploy(symbol, bar)?;
            }
        }
        self.steps += 1;
        Ok(true)
    }

    fn deploy(&mut self, symbol: &str, bar: &Bar) -> Result<(), CoreError> {
        // Symbols the feed carries beyond the allocation are replayed but never traded
        let Some(capital) = self.portfolio.flat_allocations().get(symbol) else {
            return Ok(());
        };

        let price = bar.close;
        if !(price.is_finite() && price > 0.0) {
            return Err(AccountingError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            }
            .into());
        }
        let quantity = capital / price;

        self.executor.execute(symbol, price, quantity, bar.timestamp)?;
        self.executor.mark_market_price(symbol, price)?;
        self.deployed.insert(symbol.to_string());
        debug!(symbol, price, quantity, capital, "capital deployed");

        self.strategy.on_init(symbol, bar);
        Ok(())
    }

    /// Rewind the feed and discard all position state.
    pub fn reset(&mut self) {
        self.feed.reset();
        self.executor = Executor::with_flip_policy(self.config.flip_policy);
        self.deployed.clear();
        self.steps = 0;
    }

    fn report(&self, stopped_early: bool) -> RunReport {
        let valuation = Valuation::of(&self.executor);
        RunReport {
            positions: self.executor.summary(),
            final_value: valuation.final_value,
            net_value: valuation.net_value,
            starting_balance: self.portfolio.balance(),
            steps: self.steps,
            deployed: self.deployed.len(),
            stopped_early,
        }
    }

    /// Current literal aggregate: Σ value + realized + unrealized.
    pub fn current_value(&self) -> f64 {
        Valuation::of(&self.executor).final_value
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn starting_balance(&self) -> f64 {
        self.portfolio.balance()
    }
}
