use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("synthesized stack not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stack {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed stack: {0}")]
    Shape(String),

    #[error("no synthesized stack loaded")]
    NotLoaded,

    #[error("failed to write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid policy config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}
