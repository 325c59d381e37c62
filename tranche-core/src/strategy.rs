//! Strategy hook invoked by the replay engine.
//!
//! Hooks observe bars; they do not trade. `on_init` fires once per symbol on
//! the step its capital is deployed, `on_tick` on every later bar for that
//! symbol.

use crate::domain::Bar;

pub trait Strategy {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    fn on_init(&mut self, _symbol: &str, _bar: &Bar) {}

    fn on_tick(&mut self, _symbol: &str, _bar: &Bar) {}
}

/// Strategy that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStrategy;

impl Strategy for NoOpStrategy {
    fn name(&self) -> &str {
        "noop"
    }
}
