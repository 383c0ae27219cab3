//! Price-at-timestamp service: the public entry point of the core.
//!
//! Each query is a linear state machine: validate the timestamp, ensure the
//! day's archive is cached, load its tick series, resolve the nearest price.
//! No tick series is retained across calls; repeated queries against the
//! same day re-decompress and re-parse, trading CPU for simplicity.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::cache::ArchiveCache;
use crate::domain::{Symbol, UtcInstant};
use crate::error::PriceError;
use crate::fetcher::ArchiveFetcher;
use crate::loader::{load_series, LoadError};
use crate::resolver::nearest_tick;
use crate::transport::{ArchiveTransport, ReqwestTransport};

/// Resolves market prices at arbitrary instants from daily tick archives.
pub struct PriceService {
    fetcher: ArchiveFetcher,
}

impl PriceService {
    pub fn new(fetcher: ArchiveFetcher) -> Self {
        Self { fetcher }
    }

    /// Convenience constructor with the production transport and the public
    /// archive host.
    pub fn open(cache_root: impl Into<PathBuf>) -> Self {
        let transport: Arc<dyn ArchiveTransport> = Arc::new(ReqwestTransport::new());
        Self::new(ArchiveFetcher::new(ArchiveCache::new(cache_root), transport))
    }

    pub fn fetcher(&self) -> &ArchiveFetcher {
        &self.fetcher
    }

    /// Resolve the price of `symbol` nearest to a `YYYY-MM-DD HH:MM:SS`
    /// timestamp. Malformed input fails with `InvalidFormat` before any I/O.
    pub async fn price_at(&self, symbol: &Symbol, timestamp: &str) -> Result<Decimal, PriceError> {
        let instant =
            UtcInstant::parse(timestamp).map_err(|_| PriceError::InvalidFormat {
                value: timestamp.to_owned(),
            })?;
        self.price_at_instant(symbol, instant).await
    }

    /// Resolve the price nearest to an already-validated instant.
    pub async fn price_at_instant(
        &self,
        symbol: &Symbol,
        instant: UtcInstant,
    ) -> Result<Decimal, PriceError> {
        let day = instant.date();
        let archive = self.fetcher.ensure_cached(symbol, day).await?;

        let series = load_series(&archive).map_err(|error| match error {
            LoadError::Corrupt { message } => PriceError::CorruptArchive {
                symbol: symbol.clone(),
                day,
                message,
            },
            LoadError::Empty => PriceError::EmptySeries {
                symbol: symbol.clone(),
                day,
            },
        })?;

        let tick = nearest_tick(&series, instant.unix_millis()).ok_or_else(|| {
            PriceError::NoMatch {
                symbol: symbol.clone(),
                target: instant.to_string(),
            }
        })?;

        Ok(tick.price)
    }
}

/// Lookup seam consumed by the fee reconciliation pipeline.
///
/// Object-safe so pipeline tests can substitute a deterministic stub for the
/// archive-backed service.
pub trait PriceLookup: Send + Sync {
    fn lookup<'a>(
        &'a self,
        symbol: &'a Symbol,
        instant: UtcInstant,
    ) -> Pin<Box<dyn Future<Output = Result<Decimal, PriceError>> + Send + 'a>>;
}

impl PriceLookup for PriceService {
    fn lookup<'a>(
        &'a self,
        symbol: &'a Symbol,
        instant: UtcInstant,
    ) -> Pin<Box<dyn Future<Output = Result<Decimal, PriceError>> + Send + 'a>> {
        Box::pin(self.price_at_instant(symbol, instant))
    }
}
