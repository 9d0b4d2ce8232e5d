pub mod config;
pub mod domain;
pub mod logging;
pub mod sink;

pub use config::Settings;
pub use domain::{GenerationSummary, QuaestorError};
pub use sink::LogSink;
