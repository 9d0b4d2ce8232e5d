pub mod import;
pub mod labeler;
pub mod storage;

use quaestor_core::domain::Result;
use serde::{Deserialize, Serialize};

pub use import::import_csv;
pub use labeler::label;
pub use storage::SqliteHistory;

/// One-minute candle as stored by the market data collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    pub exchange: String,
    pub market: String,
    pub timestamp: i64,
    pub lowest_price: f64,
    pub highest_price: f64,
    pub first_trade_price: f64,
    pub last_trade_price: f64,
    pub volume: f64,
}

/// Read-only access to stored candles.
pub trait HistorySource: Send + Sync {
    /// Candles of `market` with `start <= timestamp < end`, ordered by timestamp.
    fn fetch(&self, market: &str, start: i64, end: i64) -> Result<Vec<HistoricalEntry>>;

    /// Timestamp of the oldest candle, `None` when the market has no data.
    fn earliest_timestamp(&self, market: &str) -> Result<Option<i64>>;
}

/// History held in memory, kept sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoricalEntry>,
}

impl MemoryHistory {
    pub fn new(mut entries: Vec<HistoricalEntry>) -> Self {
        entries.sort_by_key(|e| e.timestamp);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoricalEntry] {
        &self.entries
    }
}

impl HistorySource for MemoryHistory {
    fn fetch(&self, market: &str, start: i64, end: i64) -> Result<Vec<HistoricalEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.market == market && e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect())
    }

    fn earliest_timestamp(&self, market: &str) -> Result<Option<i64>> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.market == market)
            .map(|e| e.timestamp))
    }
}

#[cfg(test)]
pub(crate) fn candle(market: &str, timestamp: i64, low: f64, high: f64) -> HistoricalEntry {
    HistoricalEntry {
        exchange: "test".to_string(),
        market: market.to_string(),
        timestamp,
        lowest_price: low,
        highest_price: high,
        first_trade_price: low,
        last_trade_price: high,
        volume: 1.0,
    }
}
