//! Portfolio — hierarchical capital allocation.
//!
//! The starting balance is split equally across top-level groups, then
//! equally across each group's direct members (instruments and sub-groups
//! counted alike), recursively. The tree is built once and only consulted
//! afterwards for its flattened budget.

use super::allocation::{
    AllocationEntry, AllocationNode, DuplicatePolicy, FlatAllocations, Group, GroupConfig,
    GroupSpec,
};
use super::instrument::Instrument;
use crate::error::{AccountingError, ConfigError, CoreError};
use std::collections::HashMap;
use tracing::{info, warn};

/// Allocation tree plus its flattened budget.
#[derive(Debug, Clone)]
pub struct Portfolio {
    balance: f64,
    capital: f64,
    groups: Vec<Group>,
    allocations: FlatAllocations,
}

impl Portfolio {
    /// Build with the default last-write-wins duplicate handling.
    pub fn new(balance: f64, config: &GroupConfig) -> Result<Self, CoreError> {
        Self::with_duplicate_policy(balance, config, DuplicatePolicy::default())
    }

    pub fn with_duplicate_policy(
        balance: f64,
        config: &GroupConfig,
        duplicates: DuplicatePolicy,
    ) -> Result<Self, CoreError> {
        let balance = AccountingError::check_capital("portfolio", balance)?;
        if config.groups.is_empty() {
            return Err(ConfigError::NoGroups.into());
        }

        let per_group = balance / config.groups.len() as f64;
        let mut builder = TreeBuilder {
            policy: duplicates,
            seen: HashMap::new(),
        };
        let groups = config
            .groups
            .iter()
            .map(|spec| builder.build_group(spec, per_group, &spec.name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut allocations = FlatAllocations::default();
        for group in &groups {
            group.flatten_into(&mut allocations);
        }

        info!(
            balance,
            groups = groups.len(),
            symbols = allocations.len(),
            "portfolio allocation built"
        );

        Ok(Self {
            balance,
            capital: balance,
            groups,
            allocations,
        })
    }

    /// Flattened symbol → capital budget, in depth-first config order.
    pub fn flat_allocations(&self) -> &FlatAllocations {
        &self.allocations
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.allocations.symbols()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.total()
    }
}

struct TreeBuilder {
    policy: DuplicatePolicy,
    /// symbol → path of the group that first allocated it
    seen: HashMap<String, String>,
}

impl TreeBuilder {
    fn build_group(
        &mut self,
        spec: &GroupSpec,
        capital: f64,
        path: &str,
    ) -> Result<Group, CoreError> {
        if spec.members.is_empty() {
            return Err(ConfigError::EmptyGroup {
                path: path.to_string(),
            }
            .into());
        }

        let per_member = capital / spec.members.len() as f64;
        let mut members = Vec::with_capacity(spec.members.len());

        for entry in &spec.members {
            match entry {
                AllocationEntry::Symbol(symbol) => {
                    self.register(symbol, path)?;
                    members.push(AllocationNode::Instrument(Instrument::new(
                        symbol.as_str(),
                        per_member,
                    )?));
                }
                AllocationEntry::Group(sub) => {
                    let sub_path = format!("{path}/{}", sub.name);
                    let group = self.build_group(sub, per_member, &sub_path)?;
                    members.push(AllocationNode::Group(group));
                }
            }
        }

        Ok(Group::new(spec.name.as_str(), capital, members))
    }

    fn register(&mut self, symbol: &str, path: &str) -> Result<(), ConfigError> {
        if symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol {
                group: path.to_string(),
            });
        }

        match self.seen.get(symbol) {
            None => {
                self.seen.insert(symbol.to_string(), path.to_string());
                Ok(())
            }
            Some(first) => match self.policy {
                DuplicatePolicy::Reject => Err(ConfigError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                    first: first.clone(),
                    second: path.to_string(),
                }),
                DuplicatePolicy::LastWriteWins => {
                    warn!(
                        symbol,
                        first = first.as_str(),
                        second = path,
                        "symbol allocated twice; later allocation overrides"
                    );
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> GroupConfig {
        GroupConfig::new()
            .group(
                "Crypto",
                AllocationEntry::symbols(["BTC-USD", "ETH-USD", "SOL-USD", "XRP-USD"]),
            )
            .group(
                "Forex",
                AllocationEntry::symbols(["EURUSD=X", "GBPUSD=X", "JPY=X"]),
            )
            .group("Equities", AllocationEntry::symbols(["AAPL", "MSFT"]))
            .group(
                "Derivatives",
                vec![
                    AllocationEntry::group("Index Futures", AllocationEntry::symbols(["ES=F"])),
                    AllocationEntry::group(
                        "Commodities Futures",
                        AllocationEntry::symbols(["GC=F"]),
                    ),
                ],
            )
    }

    #[test]
    fn equal_split_per_level() {
        let portfolio = Portfolio::new(10_000.0, &sample_config()).unwrap();
        let flat = portfolio.flat_allocations();

        // 4 groups → 2500 each
        assert_eq!(flat.get("BTC-USD"), Some(625.0));
        assert_eq!(flat.get("AAPL"), Some(1250.0));
        assert!((flat.get("EURUSD=X").unwrap() - 2500.0 / 3.0).abs() < 1e-9);
        // Derivatives: 2 sub-groups of 1250, one symbol each
        assert_eq!(flat.get("ES=F"), Some(1250.0));
        assert_eq!(flat.get("GC=F"), Some(1250.0));
        assert_eq!(flat.len(), 11);
        assert!((portfolio.total_allocated() - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn symbols_follow_config_order() {
        let portfolio = Portfolio::new(10_000.0, &sample_config()).unwrap();
        let symbols = portfolio.symbols();
        assert_eq!(symbols.first(), Some(&"BTC-USD"));
        assert_eq!(symbols.last(), Some(&"GC=F"));
    }

    #[test]
    fn mixed_members_count_uniformly() {
        let config = GroupConfig::new().group(
            "Mixed",
            vec![
                AllocationEntry::symbol("SPY"),
                AllocationEntry::group("Bonds", AllocationEntry::symbols(["TLT", "IEF"])),
            ],
        );
        let portfolio = Portfolio::new(1000.0, &config).unwrap();
        let flat = portfolio.flat_allocations();
        assert_eq!(flat.get("SPY"), Some(500.0));
        assert_eq!(flat.get("TLT"), Some(250.0));
        assert_eq!(flat.get("IEF"), Some(250.0));

        let group = &portfolio.groups()[0];
        let member_sum: f64 = group.members().iter().map(|m| m.capital()).sum();
        assert_eq!(group.capital(), member_sum);
    }

    #[test]
    fn empty_group_is_config_error() {
        let config = GroupConfig::new()
            .group("Equities", AllocationEntry::symbols(["AAPL"]))
            .group("Derivatives", vec![AllocationEntry::group("Index Futures", vec![])]);
        let err = Portfolio::new(1000.0, &config).unwrap_err();
        assert_eq!(
            err,
            CoreError::Config(ConfigError::EmptyGroup {
                path: "Derivatives/Index Futures".into()
            })
        );
    }

    #[test]
    fn no_groups_is_config_error() {
        let err = Portfolio::new(1000.0, &GroupConfig::new()).unwrap_err();
        assert_eq!(err, CoreError::Config(ConfigError::NoGroups));
    }

    #[test]
    fn negative_balance_is_accounting_error() {
        let config = GroupConfig::new().group("Equities", AllocationEntry::symbols(["AAPL"]));
        let err = Portfolio::new(-5.0, &config).unwrap_err();
        assert!(matches!(err, CoreError::Accounting(AccountingError::InvalidCapital { .. })));
    }

    #[test]
    fn duplicate_symbol_last_write_wins() {
        let config = GroupConfig::new()
            .group("A", AllocationEntry::symbols(["SPY", "QQQ"]))
            .group("B", AllocationEntry::symbols(["SPY"]));
        let portfolio = Portfolio::new(1000.0, &config).unwrap();
        let flat = portfolio.flat_allocations();

        // A: 250 each, B: 500 → SPY overridden by the later 500
        assert_eq!(flat.get("SPY"), Some(500.0));
        assert_eq!(flat.get("QQQ"), Some(250.0));
        assert_eq!(flat.symbols(), vec!["SPY", "QQQ"]);
        // Capital is no longer conserved under duplication
        assert_eq!(portfolio.total_allocated(), 750.0);
    }

    #[test]
    fn duplicate_symbol_rejected_when_strict() {
        let config = GroupConfig::new()
            .group("A", AllocationEntry::symbols(["SPY"]))
            .group("B", vec![AllocationEntry::group("Inner", AllocationEntry::symbols(["SPY"]))]);
        let err =
            Portfolio::with_duplicate_policy(1000.0, &config, DuplicatePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            CoreError::Config(ConfigError::DuplicateSymbol {
                symbol: "SPY".into(),
                first: "A".into(),
                second: "B/Inner".into(),
            })
        );
    }

    #[test]
    fn blank_symbol_rejected() {
        let config = GroupConfig::new().group("A", AllocationEntry::symbols(["  "]));
        assert!(matches!(
            Portfolio::new(1000.0, &config),
            Err(CoreError::Config(ConfigError::EmptySymbol { .. }))
        ));
    }
}
