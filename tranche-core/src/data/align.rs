//! Multi-symbol replay alignment.
//!
//! Given bars for multiple symbols, lay them out as replay steps. Two
//! layouts are supported:
//! - by index: step `i` carries each symbol's `i`-th bar, and a symbol is
//!   exhausted once its series ends;
//! - by timestamp: steps follow the union of all timestamps, and a symbol
//!   without a bar at a timestamp gets `None` (no forward-fill).

use super::feed::{BarFeed, FeedRow};
use crate::domain::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// How per-symbol series are laid out as replay steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Index,
    Timestamp,
}

/// In-memory feed over pre-loaded bar series.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    symbols: Vec<String>,
    /// One column per symbol, each `steps` long.
    columns: Vec<Vec<Option<Bar>>>,
    steps: usize,
    cursor: usize,
    alignment: Alignment,
}

impl ReplayFeed {
    pub fn new(series: Vec<(String, Vec<Bar>)>, alignment: Alignment) -> Self {
        match alignment {
            Alignment::Index => Self::by_index(series),
            Alignment::Timestamp => Self::by_timestamp(series),
        }
    }

    /// Step `i` carries each symbol's `i`-th bar.
    pub fn by_index(series: Vec<(String, Vec<Bar>)>) -> Self {
        let steps = series.iter().map(|(_, bars)| bars.len()).max().unwrap_or(0);
        let (symbols, columns): (Vec<_>, Vec<_>) = series
            .into_iter()
            .map(|(symbol, bars)| {
                let mut column: Vec<Option<Bar>> = bars.into_iter().map(Some).collect();
                column.resize(steps, None);
                (symbol, column)
            })
            .unzip();

        debug!(symbols = symbols.len(), steps, "index-aligned feed built");
        Self {
            symbols,
            columns,
            steps,
            cursor: 0,
            alignment: Alignment::Index,
        }
    }

    /// Steps follow the sorted union of all timestamps.
    pub fn by_timestamp(series: Vec<(String, Vec<Bar>)>) -> Self {
        let mut all_times = BTreeSet::new();
        for (_, bars) in &series {
            for bar in bars {
                all_times.insert(bar.timestamp);
            }
        }
        let timeline: Vec<DateTime<Utc>> = all_times.into_iter().collect();

        let (symbols, columns): (Vec<_>, Vec<_>) = series
            .into_iter()
            .map(|(symbol, bars)| {
                // A repeated timestamp keeps its last bar
                let by_time: HashMap<DateTime<Utc>, Bar> =
                    bars.into_iter().map(|b| (b.timestamp, b)).collect();
                let column = timeline.iter().map(|t| by_time.get(t).cloned()).collect();
                (symbol, column)
            })
            .unzip();

        debug!(
            symbols = symbols.len(),
            steps = timeline.len(),
            "timestamp-aligned feed built"
        );
        Self {
            symbols,
            columns,
            steps: timeline.len(),
            cursor: 0,
            alignment: Alignment::Timestamp,
        }
    }

    /// Total number of replay steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Index of the next step to be returned.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Number of steps at which `symbol` carries a bar.
    pub fn bar_count(&self, symbol: &str) -> usize {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].iter().filter(|b| b.is_some()).count())
            .unwrap_or(0)
    }
}

impl BarFeed for ReplayFeed {
    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn has_next(&self) -> bool {
        self.cursor < self.steps
    }

    fn next_row(&mut self) -> FeedRow {
        let step = self.cursor;
        let entries = self
            .symbols
            .iter()
            .zip(&self.columns)
            .map(|(symbol, column)| (symbol.clone(), column.get(step).cloned().flatten()))
            .collect();
        if self.cursor < self.steps {
            self.cursor += 1;
        }
        FeedRow::new(entries)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
