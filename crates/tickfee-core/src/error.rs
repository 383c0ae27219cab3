use std::path::PathBuf;

use thiserror::Error;
use time::Date;

use crate::domain::Symbol;

/// Validation errors for domain inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be YYYY-MM-DD HH:MM:SS: '{value}'")]
    BadTimestamp { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    BadDay { value: String },
}

/// Failures surfaced by the price-at-timestamp service and its collaborators.
///
/// Every variant carries enough context (symbol, day, underlying cause) for a
/// caller to log or aggregate. The core never substitutes a default price.
#[derive(Debug, Error)]
pub enum PriceError {
    /// Malformed timestamp input. Fails before any I/O is attempted.
    #[error("invalid timestamp '{value}', expected YYYY-MM-DD HH:MM:SS")]
    InvalidFormat { value: String },

    /// The remote archive could not be reached for this day.
    #[error("network failure fetching {symbol} for {day}: {message}")]
    Network {
        symbol: Symbol,
        day: Date,
        message: String,
    },

    /// The remote archive has no published data for this day.
    #[error("no archive published for {symbol} on {day} (status {status})")]
    NotAvailable {
        symbol: Symbol,
        day: Date,
        status: u16,
    },

    /// The cached or fetched archive is not a valid compressed container.
    #[error("archive for {symbol} on {day} is unreadable: {message}")]
    CorruptArchive {
        symbol: Symbol,
        day: Date,
        message: String,
    },

    /// The archive decompressed but yielded zero parsable ticks.
    #[error("archive for {symbol} on {day} contains no usable ticks")]
    EmptySeries { symbol: Symbol, day: Date },

    /// The series was non-empty but no price could be resolved. Unreachable
    /// while `EmptySeries` is checked first.
    #[error("no tick matched {target} for {symbol}")]
    NoMatch { symbol: Symbol, target: String },

    /// The fetched bytes could not be persisted under the cache path.
    #[error("cache write failed at {path}: {message}")]
    Cache { path: PathBuf, message: String },
}
