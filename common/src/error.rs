use thiserror::Error;

#[derive(Debug, Error)]
pub enum AegisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("corrupt journal record: {0}")]
    CorruptJournal(String),

    #[error("unknown op: {0}")]
    UnknownOp(String),

    #[error("{0}")]
    Other(String),
}
