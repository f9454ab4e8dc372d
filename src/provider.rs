//! Data source seams
//!
//! The engine never fetches anything. Callers plug market data, institutional
//! flow and valuation history sources in through these traits; the
//! [`Analyzer`](crate::analyzer::Analyzer) drives them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::{Mutex, MutexGuard};

use crate::score::InstitutionalFlow;
use crate::series::Bar;
use crate::valuation::ValuationPoint;
use crate::Result;

/// Default freshness window of [`CachedMarketData`]
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

// ============================================================
// TRAITS
// ============================================================

/// Daily price history for one ticker
pub trait MarketDataProvider: Send + Sync {
    /// Bars covering roughly the last `lookback_days` calendar days, in any order
    fn daily_bars(&self, ticker: &str, lookback_days: usize) -> Result<Vec<Bar>>;
}

/// Net buy/sell of the three institutional investor classes
pub trait FlowProvider: Send + Sync {
    /// `Ok(None)` when nothing is published for `date` (holiday, not yet released)
    fn institutional_flow(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<Option<InstitutionalFlow>>;
}

/// Historical PER / PBR
pub trait ValuationProvider: Send + Sync {
    fn valuation_history(&self, ticker: &str, lookback_days: usize) -> Result<Vec<ValuationPoint>>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Box<P> {
    fn daily_bars(&self, ticker: &str, lookback_days: usize) -> Result<Vec<Bar>> {
        (**self).daily_bars(ticker, lookback_days)
    }
}

// ============================================================
// CACHE
// ============================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    bars: Vec<Bar>,
    expires_at: Instant,
}

/// Time-bounded in-memory cache in front of a [`MarketDataProvider`].
///
/// Entries are keyed by `(ticker, lookback_days)`. Errors are passed through
/// and never stored. A zero TTL turns the cache into a pass-through.
#[derive(Debug)]
pub struct CachedMarketData<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<(String, usize), CacheEntry>>,
}

impl<P: MarketDataProvider> CachedMarketData<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache with a freshness window of [`DEFAULT_CACHE_TTL`]
    pub fn with_default_ttl(inner: P) -> Self {
        Self::new(inner, DEFAULT_CACHE_TTL)
    }

    #[inline]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn clear_expired(&self) {
        let now = Instant::now();
        self.lock().retain(|_, entry| entry.expires_at > now);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, usize), CacheEntry>> {
        self.entries.lock()
    }
}

impl<P: MarketDataProvider> MarketDataProvider for CachedMarketData<P> {
    fn daily_bars(&self, ticker: &str, lookback_days: usize) -> Result<Vec<Bar>> {
        if self.ttl.is_zero() {
            return self.inner.daily_bars(ticker, lookback_days);
        }

        let key = (ticker.to_owned(), lookback_days);
        if let Some(entry) = self.lock().get(&key) {
            if Instant::now() <= entry.expires_at {
                tracing::debug!(ticker, lookback_days, "market data cache hit");
                return Ok(entry.bars.clone());
            }
        }

        // The lock is not held across the fetch; concurrent misses may both fetch.
        let bars = self.inner.daily_bars(ticker, lookback_days)?;
        self.lock().insert(
            key,
            CacheEntry {
                bars: bars.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(bars)
    }
}

// ============================================================
// TESTS
// ============================================================
