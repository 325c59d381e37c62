use crate::error::AccountingError;
use serde::{Deserialize, Serialize};

/// Leaf of the allocation tree: one tradable symbol and its capital budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    symbol: String,
    capital: f64,
}

impl Instrument {
    /// Create an instrument. Capital must be finite and non-negative.
    pub fn new(symbol: impl Into<String>, capital: f64) -> Result<Self, AccountingError> {
        let symbol = symbol.into();
        let capital = AccountingError::check_capital(&symbol, capital)?;
        Ok(Self { symbol, capital })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }
}
