use crate::{HistoricalEntry, HistorySource};
use anyhow::{Context, Result};
use quaestor_core::domain::QuaestorError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// SQLite-backed candle store (`market_data` table).
#[derive(Debug, Clone)]
pub struct SqliteHistory {
    db_path: PathBuf,
}

impl SqliteHistory {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_db()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<rusqlite::Connection> {
        let conn = rusqlite::Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open market database {:?}", self.db_path))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    fn init_db(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = match rusqlite::Connection::open(&self.db_path) {
            Ok(c) => c,
            Err(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("disk i/o") || msg.contains("disk io") {
                    warn!("Disk I/O error detected. cleaning up WAL/SHM files and retrying...");
                    for path in journal_files(&self.db_path) {
                        let _ = std::fs::remove_file(path);
                    }
                    rusqlite::Connection::open(&self.db_path)?
                } else {
                    return Err(e.into());
                }
            }
        };

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS market_data (
                exchange TEXT NOT NULL,
                market TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                lowest_price REAL NOT NULL,
                highest_price REAL NOT NULL,
                first_trade_price REAL NOT NULL,
                last_trade_price REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (exchange, market, timestamp)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_market_timestamp ON market_data(market, timestamp)",
            [],
        )?;

        debug!("Market database initialized at {:?}", self.db_path);
        Ok(())
    }

    /// Upserts candles in one transaction, returning the number written.
    pub fn insert_entries(&self, entries: &[HistoricalEntry]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO market_data
                (exchange, market, timestamp, lowest_price, highest_price, first_trade_price, last_trade_price, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for entry in entries {
                written += stmt.execute(rusqlite::params![
                    entry.exchange,
                    entry.market,
                    entry.timestamp,
                    entry.lowest_price,
                    entry.highest_price,
                    entry.first_trade_price,
                    entry.last_trade_price,
                    entry.volume
                ])?;
            }
        }
        tx.commit().context("Failed to commit market data")?;
        info!("Stored {} candles in {:?}", written, self.db_path);
        Ok(written)
    }

    fn fetch_range(&self, market: &str, start: i64, end: i64) -> Result<Vec<HistoricalEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT exchange, market, timestamp, lowest_price, highest_price, first_trade_price, last_trade_price, volume
             FROM market_data
             WHERE market = ?1 AND timestamp >= ?2 AND timestamp < ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![market, start, end], |row| {
            Ok(HistoricalEntry {
                exchange: row.get(0)?,
                market: row.get(1)?,
                timestamp: row.get(2)?,
                lowest_price: row.get(3)?,
                highest_price: row.get(4)?,
                first_trade_price: row.get(5)?,
                last_trade_price: row.get(6)?,
                volume: row.get(7)?,
            })
        })?;

        let mut history = Vec::new();
        for r in rows {
            history.push(r?);
        }
        Ok(history)
    }

    fn timestamp_bound(&self, market: &str, aggregate: &str) -> Result<Option<i64>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {}(timestamp) FROM market_data WHERE market = ?1", aggregate);
        let ts: Option<i64> = conn.query_row(&sql, rusqlite::params![market], |row| row.get(0))?;
        Ok(ts)
    }

    pub fn latest_timestamp(&self, market: &str) -> Result<Option<i64>> {
        self.timestamp_bound(market, "MAX")
    }

    pub fn count(&self, market: &str) -> Result<usize> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM market_data WHERE market = ?1",
            rusqlite::params![market],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as usize)
    }

    pub fn markets(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT DISTINCT market FROM market_data ORDER BY market")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut markets = Vec::new();
        for r in rows {
            markets.push(r?);
        }
        Ok(markets)
    }
}

/// SQLite's `<db>-wal` and `<db>-shm` companions of a database file.
fn journal_files(db_path: &Path) -> [PathBuf; 2] {
    ["-wal", "-shm"].map(|suffix| {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    })
}

impl HistorySource for SqliteHistory {
    fn fetch(
        &self,
        market: &str,
        start: i64,
        end: i64,
    ) -> quaestor_core::domain::Result<Vec<HistoricalEntry>> {
        self.fetch_range(market, start, end)
            .map_err(|e| QuaestorError::Data(format!("{:#}", e)))
    }

    fn earliest_timestamp(&self, market: &str) -> quaestor_core::domain::Result<Option<i64>> {
        self.timestamp_bound(market, "MIN")
            .map_err(|e| QuaestorError::Data(format!("{:#}", e)))
    }
}
