use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{operation} did not finish within {limit:?}")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub limit: Duration,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} rejected the file: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("metadata tool failed: {0}")]
    Subprocess(String),

    #[error("unreadable metadata: {0}")]
    InvalidMetadata(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root does not exist: {0}")]
    MissingRoot(String),

    #[error("filesystem watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("cannot resolve watch root: {0}")]
    Io(#[from] std::io::Error),
}
