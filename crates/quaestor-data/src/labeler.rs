//! Urgency labels for a window of candles.
//!
//! Labels are produced by repeatedly stripping the lowest low and the highest
//! high from the entries that have not been ranked yet. The deepest low gets
//! 0.0, the highest high gets 1.0, and each following round moves both scores
//! one step (`60 / window_seconds`) towards the middle. A label near 1 marks a
//! good moment to sell, a label near 0 a good moment to buy.

use crate::HistoricalEntry;

/// Seconds covered by one expected candle.
pub const CANDLE_SECONDS: i64 = 60;

/// Returns one label per entry, in the same order as `history`.
pub fn label(history: &[HistoricalEntry], window_seconds: i64) -> Vec<f64> {
    let mut labels = vec![0.0; history.len()];
    if history.is_empty() {
        return labels;
    }

    let expected = (window_seconds / CANDLE_SECONDS).max(1);
    let step = 1.0 / expected as f64;

    let mut consumed = vec![false; history.len()];
    let mut remaining = history.len();
    let mut high_score = 1.0_f64;
    let mut low_score = 0.0_f64;

    while remaining > 0 {
        let Some((low, high)) = find_low_high(history, &consumed) else {
            break;
        };

        // A candle holding both extremes keeps the high score.
        labels[low] = low_score.clamp(0.0, 1.0);
        labels[high] = high_score.clamp(0.0, 1.0);

        for idx in [low, high] {
            if !consumed[idx] {
                consumed[idx] = true;
                remaining -= 1;
            }
        }

        high_score -= step;
        low_score += step;
    }

    labels
}

/// Index of the lowest `lowest_price` and of the highest `highest_price`
/// among unconsumed entries; the first index wins ties.
fn find_low_high(history: &[HistoricalEntry], consumed: &[bool]) -> Option<(usize, usize)> {
    let mut candidates = history
        .iter()
        .enumerate()
        .filter(|(idx, _)| !consumed[*idx]);

    let (first, entry) = candidates.next()?;
    let (mut low_idx, mut low_price) = (first, entry.lowest_price);
    let (mut high_idx, mut high_price) = (first, entry.highest_price);

    for (idx, entry) in candidates {
        if entry.lowest_price < low_price {
            low_idx = idx;
            low_price = entry.lowest_price;
        }
        if entry.highest_price > high_price {
            high_idx = idx;
            high_price = entry.highest_price;
        }
    }

    Some((low_idx, high_idx))
}
