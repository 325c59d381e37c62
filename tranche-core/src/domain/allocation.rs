//! Allocation tree types: the nested group configuration, the built tree
//! of groups and instruments, and the flattened symbol → capital budget.

use super::instrument::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a symbol that appears more than once in the hierarchy is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later allocation overrides the earlier one in the flat budget.
    #[default]
    LastWriteWins,
    /// Building the portfolio fails with `ConfigError::DuplicateSymbol`.
    Reject,
}

/// Ordered list of top-level groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub groups: Vec<GroupSpec>,
}

impl GroupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append of a top-level group.
    pub fn group(mut self, name: impl Into<String>, members: Vec<AllocationEntry>) -> Self {
        self.groups.push(GroupSpec::new(name, members));
        self
    }
}

/// A named group and its ordered members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub members: Vec<AllocationEntry>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, members: Vec<AllocationEntry>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

/// One member of a group: a symbol or a nested sub-group.
///
/// Deserializes from either a bare string or a `{ name, members }` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllocationEntry {
    Symbol(String),
    Group(GroupSpec),
}

impl AllocationEntry {
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self::Symbol(symbol.into())
    }

    pub fn group(name: impl Into<String>, members: Vec<AllocationEntry>) -> Self {
        Self::Group(GroupSpec::new(name, members))
    }

    /// Convenience for a list of plain symbols.
    pub fn symbols<I, S>(symbols: I) -> Vec<AllocationEntry>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        symbols.into_iter().map(Self::symbol).collect()
    }
}

/// A node of the built allocation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationNode {
    Group(Group),
    Instrument(Instrument),
}

impl AllocationNode {
    pub fn capital(&self) -> f64 {
        match self {
            AllocationNode::Group(g) => g.capital(),
            AllocationNode::Instrument(i) => i.capital(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AllocationNode::Group(g) => g.name(),
            AllocationNode::Instrument(i) => i.symbol(),
        }
    }
}

/// Internal node of the allocation tree.
///
/// Capital equals the sum of its members' capital by construction
/// (equal split).
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    name: String,
    capital: f64,
    members: Vec<AllocationNode>,
}

impl Group {
    pub(crate) fn new(name: impl Into<String>, capital: f64, members: Vec<AllocationNode>) -> Self {
        Self {
            name: name.into(),
            capital,
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn members(&self) -> &[AllocationNode] {
        &self.members
    }

    /// Depth-first flatten into `out`, in member order.
    pub fn flatten_into(&self, out: &mut FlatAllocations) {
        for member in &self.members {
            match member {
                AllocationNode::Instrument(inst) => {
                    out.insert(inst.symbol(), inst.capital());
                }
                AllocationNode::Group(group) => group.flatten_into(out),
            }
        }
    }

    pub fn flat_allocations(&self) -> FlatAllocations {
        let mut out = FlatAllocations::default();
        self.flatten_into(&mut out);
        out
    }
}

/// One row of the flattened budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub symbol: String,
    pub capital: f64,
}

/// Insertion-ordered symbol → capital map.
///
/// Re-inserting a symbol overwrites its capital but keeps the position of
/// the first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatAllocations {
    entries: Vec<Allocation>,
    index: HashMap<String, usize>,
}

impl FlatAllocations {
    /// Insert or overwrite. Returns the previous capital for the symbol.
    pub fn insert(&mut self, symbol: &str, capital: f64) -> Option<f64> {
        match self.index.get(symbol) {
            Some(&i) => {
                let previous = self.entries[i].capital;
                self.entries[i].capital = capital;
                Some(previous)
            }
            None => {
                self.index.insert(symbol.to_string(), self.entries.len());
                self.entries.push(Allocation {
                    symbol: symbol.to_string(),
                    capital,
                });
                None
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.index.get(symbol).map(|&i| self.entries[i].capital)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.entries.iter()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|a| a.symbol.as_str()).collect()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|a| a.capital).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Allocation] {
        &self.entries
    }
}
