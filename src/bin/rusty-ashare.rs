//! rusty-ashare CLI - run A-share backtests from a TOML config
//!
//! ## Example Usage
//!
//! ```bash
//! # Replay a config with a buy-and-hold strategy of 100 shares per symbol
//! rusty-ashare run --config backtest.toml --buy-and-hold 100
//!
//! # Forward adjust one symbol's archived K-lines
//! rusty-ashare adjust archive/000001.SZ/historical_data_DAILY_NONE.csv \
//!     archive/000001.SZ/dividend_info.csv -o adjusted.csv
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;
use rusty_ashare::clock::VirtualClock;
use rusty_ashare::config::BacktestConfig;
use rusty_ashare::data::loader::{load_dividends, load_klines, write_klines};
use rusty_ashare::data::{forward_adjust, BacktestDataFeed};
use rusty_ashare::engine::{BacktestEngine, BacktestReport};
use rusty_ashare::error::{BacktestError, Result};
use rusty_ashare::finance::LedgerSinks;
use rusty_ashare::strategy::BuyAndHold;
use rusty_ashare::types::start_of_day;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

/// rusty-ashare: A-share trading ledger and backtest replay
#[derive(Parser)]
#[command(name = "rusty-ashare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A-share trading ledger and backtest replay", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the archive described by a config file
    Run {
        /// Backtest config (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Shares of every symbol to buy on its first bar and hold
        #[arg(long, value_name = "QTY", default_value = "100")]
        buy_and_hold: Decimal,

        /// Write the full report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Forward adjust a K-line file for dividends and transfers
    Adjust {
        /// K-line CSV
        #[arg(value_name = "KLINE_FILE")]
        kline: PathBuf,

        /// Dividend CSV
        #[arg(value_name = "DIVIDEND_FILE")]
        dividends: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-ashare".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
    }

    let result = match cli.command {
        Commands::Run {
            config,
            buy_and_hold,
            report,
        } => run_backtest(&config, buy_and_hold, report.as_deref(), cli.verbose),
        Commands::Adjust {
            kline,
            dividends,
            output,
        } => adjust(&kline, &dividends, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run_backtest(
    config_path: &Path,
    quantity: Decimal,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    println!(
        "{} {} symbols from {}",
        "Running backtest:".green().bold(),
        config.symbols.len(),
        config.archive_path.display()
    );

    let started = Instant::now();
    let mut feed = BacktestDataFeed::open(config.feed_config())?;
    let start = match (feed.timeline().first(), config.start_date) {
        (Some(first), _) => *first,
        (None, Some(date)) => start_of_day(date),
        (None, None) => {
            return Err(BacktestError::DataError(
                "archive has no K-lines for the configured symbols".to_string(),
            ))
        }
    };
    if verbose {
        println!(
            "Timeline: {} steps starting {}",
            feed.remaining_steps(),
            start.to_string().dimmed()
        );
    }

    let sinks = LedgerSinks::csv(&config.output_dir)?;
    let clock = Arc::new(VirtualClock::new(start));
    let mut engine = BacktestEngine::new(config.engine_config(), clock, sinks);
    let report = engine.run(&mut feed, &mut BuyAndHold::new(quantity))?;

    print_report(&report, started.elapsed().as_secs_f64());
    println!(
        "Ledger written to {}",
        config.output_dir.display().to_string().cyan()
    );

    if let Some(path) = report_path {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &report)?;
        println!("Report written to {}", path.display().to_string().cyan());
    }
    Ok(())
}

fn print_report(report: &BacktestReport, elapsed: f64) {
    let account = &report.final_account;
    println!();
    println!("{}", "Backtest finished".green().bold());
    println!("  Trading days:       {}", report.trading_days);
    println!(
        "  Orders:             {} submitted, {} rejected",
        report.orders_submitted, report.orders_rejected
    );
    println!("  Trades:             {}", report.trades_executed);
    println!("  Final balance:      {}", account.balance());
    println!("  Commission paid:    {}", account.commission_total());
    println!("  Tax paid:           {}", account.tax_total());
    if let Some(last) = report.days.last() {
        let pnl = if last.profit_loss < Decimal::ZERO {
            last.profit_loss.to_string().red()
        } else {
            last.profit_loss.to_string().green()
        };
        println!("  Total asset:        {}", last.total_asset);
        println!("  Unrealized P&L:     {}", pnl);
    }
    println!();
    print!("{}", report.performance());
    println!("  Elapsed:            {:.2}s", elapsed);
}

fn adjust(kline_path: &Path, dividend_path: &Path, output: Option<&Path>) -> Result<()> {
    let kline = load_klines(kline_path)?;
    let dividends = load_dividends(dividend_path)?;
    let adjusted = forward_adjust(&kline, &dividends);
    log::info!(
        "Adjusted {} rows for {} dividend events",
        adjusted.len(),
        dividends.len()
    );

    match output {
        Some(path) => {
            write_klines(File::create(path)?, &adjusted)?;
            eprintln!(
                "{} {} rows to {}",
                "Wrote".green().bold(),
                adjusted.len(),
                path.display()
            );
        }
        None => write_klines(io::stdout().lock(), &adjusted)?,
    }
    Ok(())
}
