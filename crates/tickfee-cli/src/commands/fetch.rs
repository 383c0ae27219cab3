use std::sync::Arc;

use tickfee_core::{parse_day, ArchiveCache, ArchiveFetcher, ReqwestTransport, Symbol};

use crate::cli::{Cli, FetchArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli, args: &FetchArgs) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let start = parse_day(&args.start)?;
    let end = parse_day(&args.end)?;
    if end < start {
        return Err(CliError::Command(String::from(
            "end date precedes start date",
        )));
    }

    let fetcher = ArchiveFetcher::new(
        ArchiveCache::new(&cli.cache_dir),
        Arc::new(ReqwestTransport::new()),
    );

    let mut failures = 0usize;
    for fetched in fetcher.ensure_range(&symbol, start, end).await {
        match fetched.outcome {
            Ok(path) => {
                if cli.verbose {
                    eprintln!("{}: cached at {}", fetched.day, path.display());
                }
            }
            Err(error) => {
                failures += 1;
                eprintln!("{}: {error}", fetched.day);
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} day(s) could not be fetched");
    }
    Ok(())
}
