use std::time::Duration;
use thiserror::Error;

use crate::types::SourceKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An index or the query embedder could not be reached. There is no safe
    /// fallback answer without evidence, so this one surfaces to the caller.
    #[error("{signal} retrieval failed: {message}")]
    Retrieval { signal: SourceKind, message: String },
}

impl Error {
    pub fn retrieval(signal: SourceKind, err: impl std::fmt::Display) -> Self {
        Self::Retrieval { signal, message: format!("{err:#}") }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single generator call. All of them are recovered into a
/// fallback response by the orchestrator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator request failed: {0}")]
    Transport(String),

    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generator output is not a JSON object: {0}")]
    Malformed(String),

    #[error("generator timed out after {0:?}")]
    Timeout(Duration),
}
