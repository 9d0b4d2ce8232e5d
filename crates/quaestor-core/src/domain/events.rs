use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-generation report emitted by the trainer once every evaluation has
/// been joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u64,
    pub best_of_generation: f64,
    pub best_ever: f64,
    pub average: f64,
    pub population_size: usize,
    pub window_len: usize,
    pub timestamp: DateTime<Utc>,
}

impl GenerationSummary {
    pub fn new(
        generation: u64,
        best_of_generation: f64,
        best_ever: f64,
        average: f64,
        population_size: usize,
        window_len: usize,
    ) -> Self {
        Self {
            generation,
            best_of_generation,
            best_ever,
            average,
            population_size,
            window_len,
            timestamp: Utc::now(),
        }
    }

    /// One-line message for chat style log sinks.
    pub fn message(&self) -> String {
        format!(
            "Generation {}  Gen: {:.8} Best: {:.8} Avg {:.8}",
            self.generation, self.best_of_generation, self.best_ever, self.average
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingStarted {
    pub bot_name: String,
    pub market: String,
    pub population_size: usize,
    pub window_start: i64,
    pub window_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

impl TrainingStarted {
    pub fn new(
        bot_name: impl Into<String>,
        market: impl Into<String>,
        population_size: usize,
        window_start: i64,
        window_seconds: i64,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            market: market.into(),
            population_size,
            window_start,
            window_seconds,
            timestamp: Utc::now(),
        }
    }

    pub fn message(&self) -> String {
        format!(
            "{} Bot Starting on '{}' (population {}, window {}s from {})",
            self.bot_name, self.market, self.population_size, self.window_seconds, self.window_start
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_message_format() {
        let summary = GenerationSummary::new(3, 1.5, 2.25, -0.125, 100, 3600);
        assert_eq!(
            summary.message(),
            "Generation 3  Gen: 1.50000000 Best: 2.25000000 Avg -0.12500000"
        );
    }

    #[test]
    fn test_summary_serializes() {
        let summary = GenerationSummary::new(0, 0.0, 0.0, 0.0, 10, 0);
        let json = serde_json::to_string(&summary).unwrap();
        let back: GenerationSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_started_message_mentions_market() {
        let started = TrainingStarted::new("Quaestor", "BTC-USD", 100, 1_600_000_000, 216_000);
        assert!(started.message().starts_with("Quaestor Bot Starting on 'BTC-USD'"));
    }
}
