use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;

/// Pipeline-level error type.
///
/// Gateway failures are folded into `Transport` / `ModelRefusal` so callers only
/// reason about the matcher taxonomy, never about HTTP details.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model refused the request: {0}")]
    ModelRefusal(String),

    #[error("Could not decode model output: {0}")]
    SchemaParse(String),

    #[error("Retriever queried before its index was built")]
    NotReady,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read document {path}: {message}")]
    Document { path: PathBuf, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl MatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MatchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that must stop the whole run even inside the per-skill loop.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(self, MatchError::NotReady)
    }
}

impl From<LlmError> for MatchError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => MatchError::SchemaParse(e.to_string()),
            e if e.is_refusal() => MatchError::ModelRefusal(e.to_string()),
            e => MatchError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MatchError {
    fn from(err: serde_json::Error) -> Self {
        MatchError::SchemaParse(err.to_string())
    }
}
