//! Error taxonomy for the accounting and replay core.
//!
//! Configuration errors are raised before a replay starts. Accounting errors
//! abort a run instead of letting corrupted state propagate. Feed exhaustion
//! and lookups of unknown symbols are not errors.

use thiserror::Error;

/// Invalid allocation tree or feed wiring, detected before the replay.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("allocation config has no top-level groups")]
    NoGroups,

    #[error("group '{path}' has no members; capital cannot be split")]
    EmptyGroup { path: String },

    #[error("symbol '{symbol}' is allocated more than once (first in '{first}', again in '{second}')")]
    DuplicateSymbol {
        symbol: String,
        first: String,
        second: String,
    },

    #[error("allocation entry in group '{group}' has an empty symbol")]
    EmptySymbol { group: String },

    #[error("symbol '{symbol}' has an allocation but no series in the bar feed")]
    SymbolMissingFromFeed { symbol: String },
}

/// A numeric input that would corrupt position or capital state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountingError {
    #[error("invalid price {price} for '{symbol}'")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("invalid quantity {quantity} for '{symbol}'")]
    InvalidQuantity { symbol: String, quantity: f64 },

    #[error("invalid capital {capital} for '{owner}'")]
    InvalidCapital { owner: String, capital: f64 },
}

/// Any failure of the core: building the portfolio, wiring the feed, or
/// replaying it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("accounting error: {0}")]
    Accounting(#[from] AccountingError),
}

impl AccountingError {
    /// Rejects NaN, infinite and negative prices.
    pub fn check_price(symbol: &str, price: f64) -> Result<f64, AccountingError> {
        if price.is_finite() && price >= 0.0 {
            Ok(price)
        } else {
            Err(AccountingError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            })
        }
    }

    /// Rejects NaN and infinite quantities. Sign is meaningful and allowed.
    pub fn check_quantity(symbol: &str, quantity: f64) -> Result<f64, AccountingError> {
        if quantity.is_finite() {
            Ok(quantity)
        } else {
            Err(AccountingError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity,
            })
        }
    }

    /// Rejects NaN, infinite and negative capital amounts.
    pub fn check_capital(owner: &str, capital: f64) -> Result<f64, AccountingError> {
        if capital.is_finite() && capital >= 0.0 {
            Ok(capital)
        } else {
            Err(AccountingError::InvalidCapital {
                owner: owner.to_string(),
                capital,
            })
        }
    }
}
