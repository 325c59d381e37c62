//! Replay engine: position execution and the bar-by-bar driver.
//!
//! The engine walks a [`BarFeed`](crate::data::BarFeed) one step at a time.
//! Each symbol's allocation is deployed as one market buy on the first bar
//! that symbol has; later bars mark the open position.

pub mod event_loop;
pub mod executor;
pub mod report;
pub mod state;

pub use event_loop::Engine;
pub use executor::Executor;
pub use state::{EngineConfig, RunReport, Valuation};
