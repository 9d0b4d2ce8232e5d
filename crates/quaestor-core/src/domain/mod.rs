pub mod errors;
pub mod events;

pub use errors::{QuaestorError, Result};
pub use events::{GenerationSummary, TrainingStarted};
