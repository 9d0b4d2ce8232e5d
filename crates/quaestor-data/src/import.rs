use crate::HistoricalEntry;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Exchange candle row: `timestamp,low,high,open,close,volume`.
#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: i64,
    low: f64,
    high: f64,
    open: f64,
    close: f64,
    volume: f64,
}

/// Reads candles from a CSV file, sorted by timestamp with duplicate
/// timestamps dropped (first row wins).
pub fn import_csv(
    path: impl AsRef<Path>,
    exchange: &str,
    market: &str,
) -> Result<Vec<HistoricalEntry>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let entries = read_candles(BufReader::new(file), exchange, market)?;
    info!("Loaded {} candles for {} from {:?}", entries.len(), market, path);
    Ok(entries)
}

pub fn read_candles<R: Read>(reader: R, exchange: &str, market: &str) -> Result<Vec<HistoricalEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, row) in csv_reader.deserialize::<CandleRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed candle on data row {}", line + 1))?;
        entries.push(HistoricalEntry {
            exchange: exchange.to_string(),
            market: market.to_string(),
            timestamp: row.timestamp,
            lowest_price: row.low,
            highest_price: row.high,
            first_trade_price: row.open,
            last_trade_price: row.close,
            volume: row.volume,
        });
    }

    // Stable sort keeps the first of equal timestamps in front for dedup.
    entries.sort_by_key(|e| e.timestamp);
    let before = entries.len();
    entries.dedup_by_key(|e| e.timestamp);
    if entries.len() < before {
        warn!("Dropped {} duplicate candles for {}", before - entries.len(), market);
    }
    Ok(entries)
}
