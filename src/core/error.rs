//! Error types for terrain mesh generation

use thiserror::Error;

/// Main error type for the mesher
#[derive(Debug, Error)]
pub enum Error {
    /// The triangulation did not incorporate every input sample.
    #[error("Tessellation fault: triangulated {actual} of {expected} vertices")]
    Tessellation { expected: usize, actual: usize },

    /// An operation was invoked before the phase it depends on completed.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid boundary sample: {0}")]
    InvalidBoundary(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
