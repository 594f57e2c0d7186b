//! TTL-bounded cache in front of the market data provider.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::{HistoricalSeries, QuoteSnapshot};
use crate::services::provider::MarketDataProvider;

pub const QUOTE_TTL: Duration = Duration::from_secs(60);
// History updates far less often than quotes.
pub const HISTORY_TTL: Duration = Duration::from_secs(300);

/// Time source for staleness checks, injectable so tests can age entries
/// without sleeping.
pub trait CacheClock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl CacheClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<T> {
    fetched_at: Instant,
    value: T,
}

/// Caches quote snapshots and historical close series per raw symbol string.
///
/// A provider failure returns `None` and caches nothing, so the next call
/// retries immediately.
pub struct DataCache<P, C = SystemClock> {
    provider: P,
    clock: C,
    quotes: HashMap<String, Entry<QuoteSnapshot>>,
    history: HashMap<String, Entry<HistoricalSeries>>,
}

impl<P: MarketDataProvider> DataCache<P> {
    pub fn new(provider: P) -> Self {
        Self::with_clock(provider, SystemClock)
    }
}

impl<P: MarketDataProvider, C: CacheClock> DataCache<P, C> {
    pub fn with_clock(provider: P, clock: C) -> Self {
        Self {
            provider,
            clock,
            quotes: HashMap::new(),
            history: HashMap::new(),
        }
    }

    pub async fn get_quote(&mut self, symbol: &str) -> Option<QuoteSnapshot> {
        let now = self.clock.now();

        if let Some(entry) = self.quotes.get(symbol) {
            if now.duration_since(entry.fetched_at) < QUOTE_TTL {
                return Some(entry.value.clone());
            }
        }

        match self.provider.quote(symbol).await {
            Ok(quote) => {
                self.quotes.insert(
                    symbol.to_string(),
                    Entry {
                        fetched_at: now,
                        value: quote.clone(),
                    },
                );
                Some(quote)
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "quote fetch failed");
                None
            }
        }
    }

    pub async fn get_history(&mut self, symbol: &str) -> Option<HistoricalSeries> {
        let now = self.clock.now();

        if let Some(entry) = self.history.get(symbol) {
            if now.duration_since(entry.fetched_at) < HISTORY_TTL {
                return Some(entry.value.clone());
            }
        }

        match self.provider.history(symbol).await {
            Ok(series) => {
                self.history.insert(
                    symbol.to_string(),
                    Entry {
                        fetched_at: now,
                        value: series.clone(),
                    },
                );
                Some(series)
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "history fetch failed");
                None
            }
        }
    }

    pub fn invalidate(&mut self, symbol: &str) {
        self.quotes.remove(symbol);
        self.history.remove(symbol);
    }
}
