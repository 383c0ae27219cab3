//! On-demand retrieval of daily tick archives into the local cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use time::Date;

use crate::cache::ArchiveCache;
use crate::domain::{day_stamp, Symbol};
use crate::error::PriceError;
use crate::transport::ArchiveTransport;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Public host publishing daily spot trade archives.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://data.binance.vision";

/// Minimum spacing between consecutive remote retrievals. The archive host
/// has no published quota; this matches its informal rate expectations.
const FETCH_SPACING: Duration = Duration::from_millis(500);

/// Outcome of one day within a range fetch. Failures are isolated per day.
#[derive(Debug)]
pub struct DayFetch {
    pub day: Date,
    pub outcome: Result<PathBuf, PriceError>,
}

/// Fetches daily archives, skipping days already present in the cache.
pub struct ArchiveFetcher {
    cache: ArchiveCache,
    transport: Arc<dyn ArchiveTransport>,
    base_url: String,
    limiter: Arc<DirectRateLimiter>,
}

impl ArchiveFetcher {
    pub fn new(cache: ArchiveCache, transport: Arc<dyn ArchiveTransport>) -> Self {
        let quota = Quota::with_period(FETCH_SPACING).expect("fetch spacing is non-zero");
        Self {
            cache,
            transport,
            base_url: String::from(DEFAULT_ARCHIVE_BASE),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    fn archive_url(&self, symbol: &Symbol, day: Date) -> String {
        format!(
            "{}/data/spot/daily/trades/{symbol}/{symbol}-trades-{}.zip",
            self.base_url,
            day_stamp(day)
        )
    }

    /// Ensure the archive for (symbol, day) is present locally and return its
    /// path.
    ///
    /// A cache hit returns immediately: no network call, no freshness check,
    /// and no limiter wait. A miss issues a single rate-limited retrieval and
    /// persists the body atomically, so concurrent fetches of the same day
    /// cannot corrupt the cache.
    pub async fn ensure_cached(&self, symbol: &Symbol, day: Date) -> Result<PathBuf, PriceError> {
        if let Some(path) = self.cache.get(symbol, day) {
            return Ok(path);
        }

        self.limiter.until_ready().await;

        let url = self.archive_url(symbol, day);
        let response =
            self.transport
                .fetch(&url)
                .await
                .map_err(|error| PriceError::Network {
                    symbol: symbol.clone(),
                    day,
                    message: error.to_string(),
                })?;

        if !response.is_success() {
            return Err(PriceError::NotAvailable {
                symbol: symbol.clone(),
                day,
                status: response.status,
            });
        }

        self.cache
            .put(symbol, day, &response.body)
            .map_err(|error| PriceError::Cache {
                path: self.cache.path_for(symbol, day),
                message: error.to_string(),
            })
    }

    /// Fetch every day in `start..=end`, reporting each outcome separately.
    ///
    /// A failed day never aborts its siblings; cached days are skipped
    /// without touching the network.
    pub async fn ensure_range(&self, symbol: &Symbol, start: Date, end: Date) -> Vec<DayFetch> {
        let mut fetched = Vec::new();
        let mut day = start;
        while day <= end {
            let outcome = self.ensure_cached(symbol, day).await;
            fetched.push(DayFetch { day, outcome });
            match day.next_day() {
                Some(next) => day = next,
                None => break,
            }
        }
        fetched
    }
}
