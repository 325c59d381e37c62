//! Executor: owns every position and routes trades and marks to them.
//!
//! Positions are created lazily on the first trade for a symbol and are never
//! removed, even after they flatten. Lookups for symbols that were never
//! traded are defined no-ops rather than errors.

use crate::domain::{FlipPolicy, Position, PositionSnapshot};
use crate::error::AccountingError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::trace;

/// Owner of the symbol → position ledger.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    /// First-traded order.
    positions: Vec<Position>,
    index: HashMap<String, usize>,
    flip_policy: FlipPolicy,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose positions resolve reversals with `flip_policy`.
    pub fn with_flip_policy(flip_policy: FlipPolicy) -> Self {
        Self {
            flip_policy,
            ..Self::default()
        }
    }

    /// Fill `quantity` (signed) of `symbol` at `price`, creating the position
    /// on first use. Inputs are validated before a position is created.
    pub fn execute(
        &mut self,
        symbol: &str,
        price: f64,
        quantity: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), AccountingError> {
        AccountingError::check_price(symbol, price)?;
        AccountingError::check_quantity(symbol, quantity)?;

        let i = match self.index.get(symbol) {
            Some(&i) => i,
            None => {
                self.positions
                    .push(Position::with_policy(symbol, self.flip_policy));
                self.index.insert(symbol.to_string(), self.positions.len() - 1);
                self.positions.len() - 1
            }
        };
        self.positions[i].update(price, quantity, timestamp)
    }

    /// Update the mark for `symbol`. Unknown symbols are ignored.
    pub fn mark_market_price(&mut self, symbol: &str, price: f64) -> Result<(), AccountingError> {
        match self.position_mut(symbol) {
            Some(pos) => {
                trace!(symbol, price, "mark");
                pos.mark_price(price)
            }
            None => Ok(()),
        }
    }

    /// Flatten `symbol` at `price`. Unknown or flat symbols are ignored.
    pub fn close(
        &mut self,
        symbol: &str,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), AccountingError> {
        match self.position_mut(symbol) {
            Some(pos) if pos.is_open() => pos.close(price, timestamp),
            _ => Ok(()),
        }
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.index.get(symbol).map(|&i| &self.positions[i])
    }

    fn position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        match self.index.get(symbol) {
            Some(&i) => Some(&mut self.positions[i]),
            None => None,
        }
    }

    /// True iff the symbol is known and currently open.
    pub fn has_position(&self, symbol: &str) -> bool {
        self.get_position(symbol).is_some_and(|p| p.is_open())
    }

    /// All tracked positions, in first-traded order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    /// End-of-run report rows: one per tracked symbol, open or closed.
    pub fn summary(&self) -> Vec<PositionSnapshot> {
        self.positions.iter().map(Position::snapshot).collect()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.positions.iter().map(Position::realized_pnl).sum()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
