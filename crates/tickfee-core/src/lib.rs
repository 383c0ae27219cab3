//! Core library for tickfee.
//!
//! This crate contains:
//! - Canonical domain types and validation (symbols, UTC instants)
//! - The filesystem archive cache and rate-limited archive fetcher
//! - Tick series loading and nearest-timestamp price resolution
//! - The price-at-timestamp service composing the above
//! - Ledger ingestion and the fee reconciliation pipeline

pub mod cache;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod loader;
pub mod reconcile;
pub mod resolver;
pub mod service;
pub mod transport;

pub use cache::ArchiveCache;
pub use domain::{day_stamp, parse_day, Symbol, UtcInstant};
pub use error::{PriceError, ValidationError};
pub use fetcher::{ArchiveFetcher, DayFetch, DEFAULT_ARCHIVE_BASE};
pub use ledger::{
    read_ledger, FeeRow, Ledger, LedgerError, LedgerRow, OUTPUT_FEE_COLUMN, OUTPUT_PRICE_COLUMN,
    REQUIRED_COLUMNS,
};
pub use loader::{load_series, LoadError, Tick, TickSeries};
pub use reconcile::{
    reconcile, Outcome, ReconcileOptions, ReconcileReport, ReconciledRow, Summary,
};
pub use resolver::nearest_tick;
pub use service::{PriceLookup, PriceService};
pub use transport::{ArchiveResponse, ArchiveTransport, ReqwestTransport, TransportError};
