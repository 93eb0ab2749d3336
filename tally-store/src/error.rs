use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {reason}")]
    Import { line: u64, reason: String },

    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("batch of {len} writes exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("cannot decode document: {0}")]
    Decode(String),

    #[error(transparent)]
    Core(#[from] tally_core::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
