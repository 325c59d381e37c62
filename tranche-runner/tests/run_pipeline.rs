//! End-to-end runner tests: TOML file + CSV fixtures on disk → outcome.

use std::fs;
use std::path::Path;

use tranche_runner::{run_from_config, DataOrigin, LoadError, RunConfig, RunError, RunOverrides};

fn write(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
}

/// Lay out a run file plus hourly CSVs for BTC-USD, ETH-USD and ES=F.
fn fixture(dir: &Path) -> std::path::PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();

    write(
        &data.join("BTC-USD-1h.csv"),
        "Datetime,Open,High,Low,Close,Volume\n\
         2024-01-01 00:00:00+00:00,40000,40100,39900,40000,10\n\
         2024-01-01 01:00:00+00:00,40000,41000,39900,41000,12\n\
         2024-01-01 02:00:00+00:00,41000,42100,40900,42000,9\n",
    );
    write(
        &data.join("ETH-USD-1h.csv"),
        "Datetime,Open,High,Low,Close,Volume\n\
         2024-01-01 00:00:00+00:00,2000,2010,1990,2000,50\n\
         2024-01-01 01:00:00+00:00,2000,2000,1890,1900,55\n\
         2024-01-01 02:00:00+00:00,1900,1910,1790,1800,60\n",
    );
    // Starts one hour late and has no interval suffix
    write(
        &data.join("ES=F.csv"),
        "Date,Close\n\
         2024-01-01 01:00:00,5000\n\
         2024-01-01 02:00:00,5100\n",
    );

    let config = dir.join("run.toml");
    write(
        &config,
        &format!(
            r#"
[run]
initial_balance = 20000.0

[data]
dir = "{}"
interval = "1h"
alignment = "timestamp"

[[groups]]
name = "Crypto"
members = ["BTC-USD", "ETH-USD"]

[[groups]]
name = "Derivatives"
members = [{{ name = "Index Futures", members = ["ES=F"] }}]
"#,
            data.display()
        ),
    );
    config
}

#[test]
fn csv_run_deploys_each_symbol_on_its_first_bar() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::from_file(&fixture(dir.path())).unwrap();
    let outcome = run_from_config(&config, &RunOverrides::default()).unwrap();
    let report = &outcome.report;

    assert_eq!(outcome.origin, DataOrigin::Csv);
    assert_eq!(outcome.bar_count, 8);
    assert_eq!(report.steps, 3);
    assert_eq!(report.deployed, 3);

    let by_symbol = |s: &str| report.positions.iter().find(|p| p.symbol == s).unwrap();

    // 5000 at 40000 → 0.125 BTC, marked at 42000
    let btc = by_symbol("BTC-USD");
    assert_eq!(btc.quantity, 0.125);
    assert_eq!(btc.mark_price, 42_000.0);
    assert_eq!(btc.unrealized_pnl, 250.0);

    // 5000 at 2000 → 2.5 ETH, marked at 1800
    let eth = by_symbol("ETH-USD");
    assert_eq!(eth.quantity, 2.5);
    assert_eq!(eth.unrealized_pnl, -500.0);

    // 10000 at 5000 (first ES=F bar is hour 1) → 2 contracts
    let es = by_symbol("ES=F");
    assert_eq!(es.quantity, 2.0);
    assert_eq!(es.avg_price, 5_000.0);
    assert_eq!(es.unrealized_pnl, 200.0);

    let unrealized = 250.0 - 500.0 + 200.0;
    assert!((report.net_value - (20_000.0 + unrealized)).abs() < 1e-9);
    assert!((report.final_value - (20_000.0 + 2.0 * unrealized)).abs() < 1e-9);
}

#[test]
fn dataset_hash_is_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::from_file(&fixture(dir.path())).unwrap();
    let a = run_from_config(&config, &RunOverrides::default()).unwrap();
    let b = run_from_config(&config, &RunOverrides::default()).unwrap();
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.dataset_hash.len(), 64);
}

#[test]
fn max_steps_override_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::from_file(&fixture(dir.path())).unwrap();
    let outcome = run_from_config(
        &config,
        &RunOverrides {
            max_steps: Some(1),
            ..RunOverrides::default()
        },
    )
    .unwrap();

    assert!(outcome.report.stopped_early);
    assert_eq!(outcome.report.steps, 1);
    // ES=F had no bar at the first step
    assert_eq!(outcome.report.deployed, 2);
}

#[test]
fn missing_csv_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::from_file(&fixture(dir.path())).unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir_all(&empty).unwrap();

    let err = run_from_config(
        &config,
        &RunOverrides {
            data_dir: Some(empty),
            ..RunOverrides::default()
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::Data(LoadError::MissingFile { ref symbol, .. }) if symbol == "BTC-USD"
    ));
}
