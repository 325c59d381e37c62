//! Tranche CLI — replay and allocation commands.
//!
//! Commands:
//! - `run`: allocate, load bars, replay, and print the position summary
//! - `allocate`: print the flattened allocation without loading any data

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tranche_runner::{
    allocation_table, build_portfolio, run_from_config, RunConfig, RunOutcome, RunOverrides,
};

#[derive(Parser)]
#[command(
    name = "tranche",
    version,
    about = "Tranche CLI — hierarchical capital allocation over replayed bars"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay bars for every allocated symbol and report positions.
    Run {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Override `run.initial_balance`.
        #[arg(long)]
        balance: Option<f64>,

        /// Override `data.dir`.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Stop after this many replay steps.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print the outcome as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the flattened symbol → capital allocation.
    Allocate {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            balance,
            data_dir,
            max_steps,
            json,
        } => run_cmd(
            &config,
            RunOverrides {
                balance,
                data_dir,
                max_steps,
            },
            json,
        ),
        Commands::Allocate { config, json } => allocate_cmd(&config, json),
    }
}

/// Events go to stderr so `--json` output on stdout stays machine-readable.
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_cmd(config_path: &Path, overrides: RunOverrides, json: bool) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;
    let outcome = run_from_config(&config, &overrides)
        .with_context(|| format!("run {} failed", config_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    println!("{}", outcome.report);
    println!(
        "Data: {:?}, {} bars, dataset {}",
        outcome.origin,
        outcome.bar_count,
        &outcome.dataset_hash[..outcome.dataset_hash.len().min(16)]
    );
    if outcome.is_synthetic() {
        println!("WARNING: results computed on synthetic data");
    }
}

fn allocate_cmd(config_path: &Path, json: bool) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;
    let portfolio = build_portfolio(&config)?;
    let table = allocation_table(&portfolio);

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    let width = table.iter().map(|r| r.symbol.len()).max().unwrap_or(6).max(6);
    println!("{:<width$}  {:>14}  {:>8}", "Symbol", "Capital", "Weight");
    for row in &table {
        println!(
            "{:<width$}  {:>14.2}  {:>7.2}%",
            row.symbol,
            row.capital,
            row.weight * 100.0
        );
    }
    println!(
        "{:<width$}  {:>14.2}  ({} symbols, {} groups)",
        "Total",
        portfolio.total_allocated(),
        table.len(),
        portfolio.groups().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "tranche",
            "run",
            "--config",
            "run.toml",
            "--balance",
            "2500",
            "--max-steps",
            "10",
            "--json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                config,
                balance,
                max_steps,
                json,
                data_dir,
            } => {
                assert_eq!(config, PathBuf::from("run.toml"));
                assert_eq!(balance, Some(2500.0));
                assert_eq!(max_steps, Some(10));
                assert!(json);
                assert!(data_dir.is_none());
            }
            Commands::Allocate { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn allocate_requires_config() {
        assert!(Cli::try_parse_from(["tranche", "allocate"]).is_err());
    }
}
