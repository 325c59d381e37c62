//! Engine configuration and run result types.

use super::executor::Executor;
use crate::domain::{FlipPolicy, Position, PositionSnapshot};
use serde::{Deserialize, Serialize};

/// Configuration for a single replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// How positions resolve a trade that reverses them through zero.
    pub flip_policy: FlipPolicy,
    /// Stop after this many steps. Checked before each step.
    pub max_steps: Option<usize>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_flip_policy(mut self, flip_policy: FlipPolicy) -> Self {
        self.flip_policy = flip_policy;
        self
    }
}

/// End-of-run aggregate over all positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Σ value + realized + unrealized. For open positions the unrealized
    /// spread is counted on top of the marked value.
    pub final_value: f64,
    /// Σ value + realized.
    pub net_value: f64,
}

impl Valuation {
    pub fn of(executor: &Executor) -> Self {
        let mut final_value = 0.0;
        let mut net_value = 0.0;
        for pos in executor.positions() {
            let base = pos.value() + pos.realized_pnl();
            net_value += base;
            final_value += base + pos.unrealized_pnl();
        }
        Self {
            final_value,
            net_value,
        }
    }

    /// Literal aggregate for a single position.
    pub fn position_value(pos: &Position) -> f64 {
        pos.value() + pos.realized_pnl() + pos.unrealized_pnl()
    }
}

/// Result of a complete replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// One row per tracked symbol, in first-traded order.
    pub positions: Vec<PositionSnapshot>,
    pub final_value: f64,
    pub net_value: f64,
    pub starting_balance: f64,
    /// Replay steps consumed from the feed.
    pub steps: usize,
    /// Symbols whose capital was deployed.
    pub deployed: usize,
    /// True when `max_steps` ended the run before the feed was exhausted.
    pub stopped_early: bool,
}
