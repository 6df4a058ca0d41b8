use thiserror::Error;
use tutor_core::CoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
