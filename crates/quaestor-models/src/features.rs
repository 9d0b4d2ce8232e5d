use crate::network::sigmoid;
use quaestor_data::HistoricalEntry;

/// Width of the feature vector fed to a network.
pub const FEATURE_WIDTH: usize = 13;
/// Leading slots filled from the candle; the remainder stay zero.
pub const POPULATED_FEATURES: usize = 5;
/// Prices and volume are divided by this before squashing.
pub const PRICE_SCALE: f64 = 10_000.0;

/// Squashed candle features: first, last, high, low, volume, then zeros.
pub fn features(entry: &HistoricalEntry) -> [f64; FEATURE_WIDTH] {
    let mut out = [0.0; FEATURE_WIDTH];
    let raw = [
        entry.first_trade_price,
        entry.last_trade_price,
        entry.highest_price,
        entry.lowest_price,
        entry.volume,
    ];
    for (slot, value) in out.iter_mut().zip(raw) {
        *slot = sigmoid(value / PRICE_SCALE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> HistoricalEntry {
        HistoricalEntry {
            exchange: "coinbasepro".to_string(),
            market: "BTC-USD".to_string(),
            timestamp: 0,
            lowest_price: 9_000.0,
            highest_price: 11_000.0,
            first_trade_price: 10_000.0,
            last_trade_price: 10_500.0,
            volume: 0.0,
        }
    }

    #[test]
    fn test_feature_layout() {
        let f = features(&entry());
        assert_eq!(f.len(), FEATURE_WIDTH);
        assert!((f[0] - sigmoid(1.0)).abs() < 1e-12);
        assert!((f[1] - sigmoid(1.05)).abs() < 1e-12);
        assert!((f[2] - sigmoid(1.1)).abs() < 1e-12);
        assert!((f[3] - sigmoid(0.9)).abs() < 1e-12);
        assert!((f[4] - 0.5).abs() < 1e-12);
        assert!(f[POPULATED_FEATURES..].iter().all(|v| *v == 0.0));
    }
}
