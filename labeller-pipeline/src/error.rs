use std::path::PathBuf;
use thiserror::Error;

use labeller_ingest::IngestError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] labeller_core::Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("model artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("corrupt model artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("row {row} is out of range for a batch of {rows}")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("{predictions} predictions for {rows} rows")]
    PredictionMismatch { rows: usize, predictions: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// True when the failure means no fitted model was available.
    pub fn is_not_fitted(&self) -> bool {
        matches!(self, Error::Model(labeller_core::Error::NotFitted(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
