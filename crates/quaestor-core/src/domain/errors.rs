use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuaestorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Log sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QuaestorError>;
