use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),

    #[error("{source_name} has no {column:?} column")]
    MissingColumn {
        column: &'static str,
        source_name: String,
    },

    #[error("{source_name} line {line}: {found} fields, header has {expected}")]
    RaggedRow {
        source_name: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
