use thiserror::Error;

/// Error type for population simulation operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed or incomplete configuration bundle.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Invalid call parameters.
    #[error("Domain error: {0}")]
    Domain(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for SimError {
    fn from(e: bincode::Error) -> Self {
        SimError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for SimError {
    fn from(e: csv::Error) -> Self {
        SimError::Serialization(e.to_string())
    }
}
