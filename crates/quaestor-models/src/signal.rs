use crate::features::features;
use crate::network::{compute, Network};
use quaestor_data::HistoricalEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output slot read as "hold".
pub const HOLD: usize = 0;
/// Output slot read as "buy"; trained towards `1 - label`.
pub const BUY: usize = 1;
/// Output slot read as "sell"; trained towards `label`.
pub const SELL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Hold,
    Buy,
    Sell,
}

impl Signal {
    /// Strongest output wins, earlier slots win ties. Anything unreadable holds.
    pub fn from_output(output: &[f64]) -> Self {
        let mut best: Option<(usize, f64)> = None;
        for (idx, value) in output.iter().copied().enumerate().take(SELL + 1) {
            match best {
                Some((_, top)) if value <= top => {}
                _ if value.is_nan() => {}
                _ => best = Some((idx, value)),
            }
        }
        match best {
            Some((BUY, _)) => Signal::Buy,
            Some((SELL, _)) => Signal::Sell,
            _ => Signal::Hold,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "HOLD"),
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

pub fn decide(net: &Network, entry: &HistoricalEntry) -> Signal {
    Signal::from_output(&compute(&features(entry), net))
}
