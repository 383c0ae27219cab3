//! CLI argument definitions for tickfee.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Reconcile trading-fee ledgers against archived market tick data.
#[derive(Debug, Parser)]
#[command(
    name = "tickfee",
    author,
    version,
    about = "Trading-fee reconciliation against archived tick data",
    long_about = "tickfee computes the USD-equivalent value of trading fees from a ledger \
export. Fees paid in the reference token are valued by nearest-timestamp \
lookup against daily tick archives, downloaded on demand and cached locally."
)]
pub struct Cli {
    /// Directory holding downloaded daily tick archives.
    #[arg(long, global = true, default_value = "archives")]
    pub cache_dir: PathBuf,

    /// Print progress diagnostics while processing.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile a fee ledger into USD-equivalent fees.
    ///
    /// Reads a tabular export with the columns Date(UTC), Fee Coin, Fee,
    /// and Price, writes it back with two resolved columns appended, and
    /// prints a fee summary.
    ///
    /// # Examples
    ///
    ///   tickfee fees -i trade_history.csv -o fees.csv
    ///   tickfee fees -i trade_history.tsv --symbol BNBUSDT --workers 8
    Fees(FeesArgs),

    /// Prefetch daily tick archives for a date range.
    ///
    /// Days already cached are skipped; a day the archive has not published
    /// is reported and does not abort the rest of the range.
    ///
    /// # Examples
    ///
    ///   tickfee fetch BNBUSDT --start 2024-05-01 --end 2024-05-31
    Fetch(FetchArgs),
}

/// Arguments for the `fees` command.
#[derive(Debug, Args)]
pub struct FeesArgs {
    /// Input ledger file (.csv or .tsv).
    #[arg(short, long, default_value = "trade_history.csv")]
    pub input: PathBuf,

    /// Output CSV file with the resolved columns appended.
    #[arg(short, long, default_value = "trade_history_with_fees.csv")]
    pub output: PathBuf,

    /// Market pair used to price reference-token fees.
    #[arg(long, default_value = "BNBUSDT")]
    pub symbol: String,

    /// Number of parallel row chunks (defaults to available cores).
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Arguments for the `fetch` command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Market pair to fetch archives for.
    pub symbol: String,

    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day of the range, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,
}
