//! Bar feed contract consumed by the replay engine.
//!
//! A feed yields one row per replay step. Each row carries an optional bar
//! for every symbol the feed tracks; `None` means the symbol has no bar at
//! that step (its series is exhausted, or it has a gap).

use crate::domain::Bar;

/// One replay step: an optional bar per tracked symbol, in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedRow {
    entries: Vec<(String, Option<Bar>)>,
}

impl FeedRow {
    pub fn new(entries: Vec<(String, Option<Bar>)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Bar>)> {
        self.entries.iter().map(|(s, b)| (s.as_str(), b.as_ref()))
    }

    /// The bar for `symbol` at this step, if any.
    pub fn get(&self, symbol: &str) -> Option<&Bar> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .and_then(|(_, b)| b.as_ref())
    }

    /// Number of symbols carrying a bar at this step.
    pub fn present(&self) -> usize {
        self.entries.iter().filter(|(_, b)| b.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of synchronized bar rows.
///
/// Iteration is monotonic; only [`BarFeed::reset`] rewinds the cursor.
pub trait BarFeed {
    /// Symbols this feed carries, in row order.
    fn symbols(&self) -> &[String];

    /// Whether another step with at least one remaining series exists.
    fn has_next(&self) -> bool;

    /// Advance one step. Past the end, every entry is `None`.
    fn next_row(&mut self) -> FeedRow;

    /// Return the cursor to the first step.
    fn reset(&mut self);

    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn row_lookup_and_counts() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let row = FeedRow::new(vec![
            ("SPY".into(), Some(Bar::flat(ts, 100.0))),
            ("QQQ".into(), None),
        ]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.present(), 1);
        assert_eq!(row.get("SPY").map(|b| b.close), Some(100.0));
        assert!(row.get("QQQ").is_none());
        assert!(row.get("IWM").is_none());
    }
}
