//! Error types for the dump importer

use thiserror::Error;

/// Importer errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("file argument required")]
    MissingFile,

    #[error("failed to connect to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Decompression error: {0}")]
    Decompress(std::io::Error),

    #[error("reading input: {0}")]
    Scan(std::io::Error),

    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0} stopped before the scan finished")]
    WorkerGone(&'static str),
}

/// Result type for importer operations
pub type Result<T> = std::result::Result<T, ImportError>;
