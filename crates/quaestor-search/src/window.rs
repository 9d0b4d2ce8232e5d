use quaestor_data::{label, HistoricalEntry, HistorySource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Candles of one training range with their urgency labels, index aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWindow {
    pub start: i64,
    pub end: i64,
    pub entries: Vec<HistoricalEntry>,
    pub labels: Vec<f64>,
}

impl LabeledWindow {
    pub fn empty(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            entries: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Supplies the labeled window for each generation.
///
/// The start is taken from configuration or, when unset, from the oldest
/// stored candle. The window stays put unless an advance is configured, and
/// a labeled window is reused for as long as its range does not change.
/// Source failures never propagate: they yield an empty window.
pub struct TrainingWindow {
    source: Arc<dyn HistorySource>,
    market: String,
    window_seconds: i64,
    advance_seconds: i64,
    start: Option<i64>,
    cached: Option<Arc<LabeledWindow>>,
}

impl TrainingWindow {
    pub fn new(
        source: Arc<dyn HistorySource>,
        market: impl Into<String>,
        window_seconds: i64,
        start: Option<i64>,
        advance_seconds: i64,
    ) -> Self {
        Self {
            source,
            market: market.into(),
            window_seconds,
            advance_seconds: advance_seconds.max(0),
            start,
            cached: None,
        }
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn window_seconds(&self) -> i64 {
        self.window_seconds
    }

    /// Start of the next window, looking it up in the source if needed.
    pub fn resolve_start(&mut self) -> Option<i64> {
        if self.start.is_none() {
            match self.source.earliest_timestamp(&self.market) {
                Ok(Some(ts)) => self.start = Some(ts),
                Ok(None) => warn!("No stored history for {}", self.market),
                Err(e) => warn!("Failed to find first candle for {}: {}", self.market, e),
            }
        }
        self.start
    }

    /// Labeled window for the current generation, then moves the range
    /// forward if an advance is configured.
    pub fn next_window(&mut self) -> Arc<LabeledWindow> {
        let Some(start) = self.resolve_start() else {
            return Arc::new(LabeledWindow::empty(0, 0));
        };
        let end = start.saturating_add(self.window_seconds);
        let window = self.load(start, end);
        if self.advance_seconds > 0 {
            self.start = Some(start.saturating_add(self.advance_seconds));
        }
        window
    }

    fn load(&mut self, start: i64, end: i64) -> Arc<LabeledWindow> {
        if let Some(cached) = &self.cached {
            if cached.start == start && cached.end == end {
                return Arc::clone(cached);
            }
        }

        match self.source.fetch(&self.market, start, end) {
            Ok(entries) => {
                let labels = label(&entries, self.window_seconds);
                debug!("Labeled {} candles of {} in [{}, {})", entries.len(), self.market, start, end);
                let window = Arc::new(LabeledWindow {
                    start,
                    end,
                    entries,
                    labels,
                });
                self.cached = Some(Arc::clone(&window));
                window
            }
            Err(e) => {
                warn!("History fetch for {} failed, training on an empty window: {}", self.market, e);
                Arc::new(LabeledWindow::empty(start, end))
            }
        }
    }
}
