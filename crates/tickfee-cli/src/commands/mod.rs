mod fees;
mod fetch;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Fees(args) => fees::run(cli, args).await,
        Command::Fetch(args) => fetch::run(cli, args).await,
    }
}
