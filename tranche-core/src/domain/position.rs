//! Position — per-symbol weighted-average-cost ledger.
//!
//! A position moves between three regimes of its signed quantity: flat (0),
//! long (> 0) and short (< 0). All state changes go through [`Position::update`]
//! and [`Position::mark_price`].

use crate::error::AccountingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Residual quantities at or below this magnitude are treated as flat.
pub const QTY_EPSILON: f64 = 1e-9;

/// What happens when a single trade reverses a position through zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipPolicy {
    /// Close the old exposure, then open the excess at the trade price.
    #[default]
    Reopen,
    /// Realize only the closed part and keep the old average cost for the
    /// new direction.
    CarryCost,
}

/// Position ledger for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    quantity: f64,
    avg_price: f64,
    mark_price: f64,
    realized_pnl: f64,
    entry_timestamps: Vec<DateTime<Utc>>,
    flip_policy: FlipPolicy,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_policy(symbol, FlipPolicy::default())
    }

    pub fn with_policy(symbol: impl Into<String>, flip_policy: FlipPolicy) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0.0,
            avg_price: 0.0,
            mark_price: 0.0,
            realized_pnl: 0.0,
            entry_timestamps: Vec::new(),
            flip_policy,
        }
    }

    /// Apply a fill of `qty` (signed) at `price`.
    ///
    /// Same-direction fills (or fills from flat) blend the average cost.
    /// Opposite-direction fills realize P&L on the closed size. Invalid
    /// inputs are rejected before any state changes.
    pub fn update(
        &mut self,
        price: f64,
        qty: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), AccountingError> {
        AccountingError::check_price(&self.symbol, price)?;
        AccountingError::check_quantity(&self.symbol, qty)?;

        if qty == 0.0 {
            return Ok(());
        }

        if self.quantity == 0.0 || self.quantity.signum() == qty.signum() {
            self.increase(price, qty, timestamp);
        } else {
            self.decrease(price, qty, timestamp);
        }
        Ok(())
    }

    fn increase(&mut self, price: f64, qty: f64, timestamp: DateTime<Utc>) {
        let held = self.quantity.abs();
        let added = qty.abs();
        self.avg_price = (self.avg_price * held + price * added) / (held + added);
        self.quantity += qty;
        self.entry_timestamps.push(timestamp);
    }

    fn decrease(&mut self, price: f64, qty: f64, timestamp: DateTime<Utc>) {
        let was_long = self.quantity > 0.0;
        let closing_qty = qty.abs().min(self.quantity.abs());
        self.realized_pnl += (price - self.avg_price) * closing_qty * self.quantity.signum();
        self.quantity += qty;

        if self.quantity.abs() <= QTY_EPSILON {
            self.flatten();
            return;
        }

        let flipped = (self.quantity > 0.0) != was_long;
        if flipped && self.flip_policy == FlipPolicy::Reopen {
            self.avg_price = price;
            self.entry_timestamps.clear();
            self.entry_timestamps.push(timestamp);
        }
    }

    fn flatten(&mut self) {
        self.quantity = 0.0;
        self.avg_price = 0.0;
        self.entry_timestamps.clear();
    }

    /// Close the whole position at `price`. No-op when already flat.
    pub fn close(&mut self, price: f64, timestamp: DateTime<Utc>) -> Result<(), AccountingError> {
        if !self.is_open() {
            return Ok(());
        }
        self.update(price, -self.quantity, timestamp)
    }

    /// Set the current mark. Cost basis and realized P&L are untouched.
    pub fn mark_price(&mut self, price: f64) -> Result<(), AccountingError> {
        self.mark_price = AccountingError::check_price(&self.symbol, price)?;
        Ok(())
    }

    /// Paper P&L at the current mark; sign-correct for shorts because the
    /// quantity carries the sign.
    pub fn unrealized_pnl(&self) -> f64 {
        (self.mark_price - self.avg_price) * self.quantity
    }

    pub fn value(&self) -> f64 {
        self.mark_price * self.quantity
    }

    pub fn is_open(&self) -> bool {
        self.quantity != 0.0
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn avg_price(&self) -> f64 {
        self.avg_price
    }

    pub fn current_price(&self) -> f64 {
        self.mark_price
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn entry_timestamps(&self) -> &[DateTime<Utc>] {
        &self.entry_timestamps
    }

    pub fn flip_policy(&self) -> FlipPolicy {
        self.flip_policy
    }

    /// Read-only copy of the reportable fields.
    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            symbol: self.symbol.clone(),
            is_open: self.is_open(),
            quantity: self.quantity,
            avg_price: self.avg_price,
            mark_price: self.mark_price,
            value: self.value(),
            unrealized_pnl: self.unrealized_pnl(),
            realized_pnl: self.realized_pnl,
            entries: self.entry_timestamps.len(),
        }
    }
}

/// Point-in-time view of a position, used for end-of-run reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub is_open: bool,
    pub quantity: f64,
    pub avg_price: f64,
    pub mark_price: f64,
    pub value: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub entries: usize,
}
