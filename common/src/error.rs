use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AskDbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Metadata file not found: {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Table {0} not found.")]
    TableNotFound(String),

    #[error("sql execution failed: {0}")]
    SqlExecution(String),

    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, AskDbError>;
