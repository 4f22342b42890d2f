//! Error taxonomy shared by every stage of the classification pipeline.

use thiserror::Error;

/// Errors raised by the vectorizer, classifier, ranker and evaluation code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An operation that needs a prior `fit` was called on an unfitted component.
    #[error("{0} is not fitted; call fit first")]
    NotFitted(&'static str),

    /// Training or evaluation data is malformed (mismatched lengths, empty labels, ...).
    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    /// The corpus produced no tokens to build a vocabulary from.
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    /// A feature vector does not match the fitted vocabulary size.
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A configuration value is out of range or unparseable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cross-validation could not be set up at all.
    #[error("cross-validation failed: {0}")]
    CrossValidation(String),
}

impl Error {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidTrainingData(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
