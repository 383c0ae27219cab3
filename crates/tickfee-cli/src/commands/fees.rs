use std::sync::Arc;

use tickfee_core::{read_ledger, reconcile, PriceService, ReconcileOptions, Symbol};

use crate::cli::{Cli, FeesArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli, args: &FeesArgs) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    // Fail fast on unreadable input or missing columns, before any lookup.
    let ledger = read_ledger(&args.input)?;
    if cli.verbose {
        eprintln!("processing {} rows...", ledger.rows.len());
    }

    let mut options = ReconcileOptions::new(symbol);
    if let Some(workers) = args.workers {
        options.workers = workers;
    }

    let service = PriceService::open(&cli.cache_dir);
    let report = reconcile(ledger, Arc::new(service), &options).await;

    report.write_csv(&args.output)?;
    if cli.verbose {
        eprintln!("wrote {}", args.output.display());
    }

    println!("{}", report.summary);
    Ok(())
}
