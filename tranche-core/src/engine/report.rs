//! Plain-text rendering of a finished replay.

use super::state::RunReport;
use crate::domain::PositionSnapshot;
use std::fmt;

impl fmt::Display for PositionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} Qty={:.4}, AvgPrice={:.2}, CurPrice={:.2}, Value={:.2}, \
             UnrealizedPnL={:.2}, RealizedPnL={:.2}, Entries={}",
            self.symbol,
            if self.is_open { "OPEN" } else { "CLOSED" },
            self.quantity,
            self.avg_price,
            self.mark_price,
            self.value,
            self.unrealized_pnl,
            self.realized_pnl,
            self.entries,
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Positions Summary ===")?;
        for pos in &self.positions {
            writeln!(f, "{pos}")?;
        }
        write!(f, "Steps: {}, Deployed: {}", self.steps, self.deployed)?;
        if self.stopped_early {
            write!(f, " (stopped early)")?;
        }
        writeln!(f)?;
        write!(
            f,
            "Final Portfolio Value: {:.2}, Net Value: {:.2}, Starting Balance: {:.2}",
            self.final_value, self.net_value, self.starting_balance
        )
    }
}
