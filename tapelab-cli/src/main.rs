//! Tapelab CLI — run event-driven backtests from the command line.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file or ad-hoc flags,
//!   against seeded synthetic market data, and print summary statistics
//! - optional `--equity-csv` exports the derived equity curve
//! - optional `--snapshot-dir` mirrors ledger snapshots as JSON documents

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tapelab_core::clock::BacktestClock;
use tapelab_core::config::SimulationConfig;
use tapelab_core::data::{synthetic_walk, MemoryProvider, RetryPolicy};
use tapelab_core::engine::{union_calendar, SimulationEngine, SimulationReport};
use tapelab_core::portfolio::JsonSnapshotStore;
use tapelab_core::strategy::MaCrossStrategy;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tapelab", about = "Tapelab — event-driven trading simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest and print summary statistics.
    Run {
        /// Path to a TOML simulation config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol for an ad-hoc run (ignored with --config).
        #[arg(long, default_value = "SPY")]
        symbol: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2022-01-03")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2022-12-30")]
        end: String,

        /// Initial capital for an ad-hoc run.
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,

        /// Short moving-average window.
        #[arg(long, default_value_t = 10)]
        short: usize,

        /// Long moving-average window.
        #[arg(long, default_value_t = 20)]
        long: usize,

        /// Seed for the synthetic price walk.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Mirror ledger snapshots as JSON documents into this directory.
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Export the equity curve as CSV.
        #[arg(long)]
        equity_csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            symbol,
            start,
            end,
            capital,
            short,
            long,
            seed,
            snapshot_dir,
            equity_csv,
        } => {
            let config = match config {
                Some(path) => SimulationConfig::load(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => {
                    let start = parse_date(&start)?;
                    let end = parse_date(&end)?;
                    let mut config = SimulationConfig::demo(&symbol, start, end);
                    config.initial_capital = capital;
                    config
                }
            };
            if short >= long {
                bail!("--short ({short}) must be below --long ({long})");
            }
            let report = run_backtest(&config, short, long, seed, snapshot_dir)?;
            print_report(&config, &report);
            if let Some(path) = equity_csv {
                export_equity_csv(&path, &report)?;
                println!("\nEquity curve written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn run_backtest(
    config: &SimulationConfig,
    short: usize,
    long: usize,
    seed: u64,
    snapshot_dir: Option<PathBuf>,
) -> Result<SimulationReport> {
    let provider = Arc::new(build_synthetic_provider(config, seed));
    let calendar = union_calendar(
        provider.as_ref(),
        &config.symbols,
        config.start_date,
        config.end_date,
    )?;
    if calendar.is_empty() {
        bail!("no trading dates between {} and {}", config.start_date, config.end_date);
    }
    let clock = Box::new(BacktestClock::new(calendar));
    let strategy = Box::new(MaCrossStrategy::new(1, short, long));

    let mut engine = SimulationEngine::backtest(config, provider, strategy, clock)?
        .with_retry_policy(RetryPolicy::immediate());
    if let Some(dir) = snapshot_dir {
        engine = engine.with_snapshot_store(Box::new(JsonSnapshotStore::new(dir)));
    }
    Ok(engine.run()?)
}

/// Seeded random-walk bars for every configured symbol across the window.
fn build_synthetic_provider(config: &SimulationConfig, seed: u64) -> MemoryProvider {
    let days = (config.end_date - config.start_date).num_days().max(0) as usize;
    let weekdays = days * 5 / 7 + 1;
    let mut provider = MemoryProvider::new();
    for (i, symbol) in config.symbols.iter().enumerate() {
        let bars = synthetic_walk(
            symbol,
            config.start_date,
            weekdays,
            100.0 + 50.0 * i as f64,
            0.0006,
            0.012,
            seed.wrapping_add(i as u64),
        );
        provider.insert_bars(bars.into_iter().filter(|b| b.date <= config.end_date));
    }
    provider
}

fn print_report(config: &SimulationConfig, report: &SimulationReport) {
    let stats = &report.statistics;
    println!("Run {}", config.run_id());
    println!("Portfolio:         {}", report.portfolio_id);
    println!("Symbols:           {}", config.symbols.join(", "));
    println!(
        "Window:            {} .. {}",
        config.start_date, config.end_date
    );
    println!("Signals/Orders/Fills: {}/{}/{}", report.signals, report.orders, report.fills);
    println!("Total Return:      {:.2}%", stats.total_return_pct);
    println!("Sharpe Ratio:      {:.2}", stats.sharpe_ratio);
    println!("Max Drawdown:      {:.2}%", stats.max_drawdown * 100.0);
    println!("Drawdown Duration: {} bars", stats.drawdown_duration);
}

fn export_equity_csv(path: &PathBuf, report: &SimulationReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["date", "total", "returns", "curve", "drawdown"])?;
    for point in &report.statistics.equity_curve {
        writer.write_record([
            point.date.to_string(),
            format!("{:.2}", point.total),
            format!("{:.6}", point.returns),
            format!("{:.6}", point.curve),
            format!("{:.6}", point.drawdown),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
