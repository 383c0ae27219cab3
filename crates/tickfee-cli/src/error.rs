use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickfee_core::ValidationError),

    #[error(transparent)]
    Ledger(#[from] tickfee_core::LedgerError),

    #[error(transparent)]
    Price(#[from] tickfee_core::PriceError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Ledger(_) => 2,
            Self::Price(_) | Self::Command(_) | Self::Io(_) => 10,
        }
    }
}
