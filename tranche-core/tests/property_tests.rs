//! Property tests for allocation and accounting invariants.
//!
//! Uses proptest to verify:
//! 1. Conservation: the flat allocation sums to the starting balance
//! 2. Zero-net reset: buying then selling the same size leaves the position flat
//! 3. Realized P&L on a round trip equals (exit - entry) × size
//! 4. Marking never touches quantity, average cost, or realized P&L

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tranche_core::domain::{AllocationEntry, GroupConfig, GroupSpec, Portfolio, Position};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_quantity() -> impl Strategy<Value = f64> {
    (0.01..1000.0_f64).prop_map(|q| (q * 100.0).round() / 100.0)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..50_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// Group tree up to three levels deep with unique symbol names.
fn arb_member(depth: u32) -> BoxedStrategy<AllocationEntry> {
    let leaf = Just(()).prop_map(|_| AllocationEntry::symbol("X")).boxed();
    if depth == 0 {
        return leaf;
    }
    prop_oneof![
        3 => leaf,
        1 => prop::collection::vec(arb_member(depth - 1), 1..4)
            .prop_map(|members| AllocationEntry::group("G", members)),
    ]
    .boxed()
}

fn arb_config() -> impl Strategy<Value = GroupConfig> {
    prop::collection::vec(prop::collection::vec(arb_member(2), 1..5), 1..5).prop_map(|groups| {
        let mut counter = 0usize;
        let groups = groups
            .into_iter()
            .enumerate()
            .map(|(g, members)| {
                GroupSpec::new(format!("Group{g}"), rename(members, &mut counter))
            })
            .collect();
        GroupConfig { groups }
    })
}

/// Give every leaf a distinct symbol so duplicates never collapse the budget.
fn rename(members: Vec<AllocationEntry>, counter: &mut usize) -> Vec<AllocationEntry> {
    members
        .into_iter()
        .map(|m| match m {
            AllocationEntry::Symbol(_) => {
                *counter += 1;
                AllocationEntry::symbol(format!("SYM{counter}"))
            }
            AllocationEntry::Group(spec) => {
                AllocationEntry::group(spec.name, rename(spec.members, counter))
            }
        })
        .collect()
}

// ── 1. Conservation ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn flat_allocation_sums_to_balance(
        config in arb_config(),
        balance in 1.0..10_000_000.0_f64,
    ) {
        let portfolio = Portfolio::new(balance, &config).unwrap();
        let total = portfolio.total_allocated();
        prop_assert!(
            (total - balance).abs() <= 1e-9 * balance,
            "total {total} vs balance {balance}"
        );
        for alloc in portfolio.flat_allocations().iter() {
            prop_assert!(alloc.capital > 0.0);
        }
    }

    #[test]
    fn group_capital_equals_member_sum(config in arb_config()) {
        let portfolio = Portfolio::new(100_000.0, &config).unwrap();
        for group in portfolio.groups() {
            let members: f64 = group.members().iter().map(|m| m.capital()).sum();
            prop_assert!((group.capital() - members).abs() < 1e-6);
        }
    }
}

// ── 2-4. Position accounting ─────────────────────────────────────────

proptest! {
    #[test]
    fn zero_net_trades_reset_position(
        qty in arb_quantity(),
        entry in arb_price(),
        exit in arb_price(),
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut pos = Position::new("SPY");
        pos.update(entry, qty, ts).unwrap();
        pos.update(exit, -qty, ts).unwrap();

        prop_assert!(!pos.is_open());
        prop_assert_eq!(pos.quantity(), 0.0);
        prop_assert_eq!(pos.avg_price(), 0.0);
        prop_assert!(pos.entry_timestamps().is_empty());

        let expected = (exit - entry) * qty;
        prop_assert!((pos.realized_pnl() - expected).abs() <= 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn short_round_trip_realizes_inverse(
        qty in arb_quantity(),
        entry in arb_price(),
        exit in arb_price(),
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut pos = Position::new("ETH-USD");
        pos.update(entry, -qty, ts).unwrap();
        pos.close(exit, ts).unwrap();

        prop_assert!(!pos.is_open());
        let expected = (entry - exit) * qty;
        prop_assert!((pos.realized_pnl() - expected).abs() <= 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn marking_only_moves_mark(
        qty in arb_quantity(),
        entry in arb_price(),
        marks in prop::collection::vec(arb_price(), 1..20),
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut pos = Position::new("BTC-USD");
        pos.update(entry, qty, ts).unwrap();
        let (q, avg, realized) = (pos.quantity(), pos.avg_price(), pos.realized_pnl());

        for &m in &marks {
            pos.mark_price(m).unwrap();
            prop_assert_eq!(pos.quantity(), q);
            prop_assert_eq!(pos.avg_price(), avg);
            prop_assert_eq!(pos.realized_pnl(), realized);
            prop_assert_eq!(pos.current_price(), m);
        }
    }
}
