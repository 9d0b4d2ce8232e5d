pub mod engine;
pub mod fitness;
pub mod selection;
pub mod window;

pub use engine::{BestNetworkHandle, GenerationOutcome, Phase, ScoredNetwork, Trainer, TrainingState};
pub use fitness::score;
pub use selection::{best_of, select_elites};
pub use window::{LabeledWindow, TrainingWindow};
