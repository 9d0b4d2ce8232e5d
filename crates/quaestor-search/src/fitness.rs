use crate::window::LabeledWindow;
use quaestor_data::HistoricalEntry;
use quaestor_models::signal::{BUY, HOLD, SELL};
use quaestor_models::{compute, features, Network};

/// Labels above this reward selling.
pub const SELL_REGIME: f64 = 0.8;
/// Labels below this reward buying.
pub const BUY_REGIME: f64 = 0.2;

/// Contribution of one `[hold, buy, sell]` output against its urgency label.
/// Missing output slots read as zero.
pub fn score_output(output: &[f64], label: f64) -> f64 {
    let slot = |idx: usize| output.get(idx).copied().unwrap_or(0.0);
    let (hold, buy, sell) = (slot(HOLD), slot(BUY), slot(SELL));

    let mut total = -hold * label;
    if label > SELL_REGIME {
        total += sell * label;
        total -= buy * label;
    } else if label < BUY_REGIME {
        total += buy * (1.0 - label);
        total -= sell * label;
    } else {
        total -= buy * label;
        total -= sell * label;
    }
    total
}

/// Sum of per-entry contributions; pairs beyond the shorter slice are ignored.
pub fn score_entries(net: &Network, entries: &[HistoricalEntry], labels: &[f64]) -> f64 {
    entries
        .iter()
        .zip(labels)
        .map(|(entry, &label)| score_output(&compute(&features(entry), net), label))
        .sum()
}

pub fn score(net: &Network, window: &LabeledWindow) -> f64 {
    score_entries(net, &window.entries, &window.labels)
}
