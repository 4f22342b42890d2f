//! labeller-pipeline: artifact persistence, the training driver, the
//! inference facade and reviewer session state.

pub mod error;
pub mod persistence;
pub mod predictor;
pub mod review;
pub mod trainer;

pub use error::{Error, Result};
pub use persistence::{ArtifactPaths, ArtifactStore};
pub use predictor::{DEFAULT_TOP_N, LoadedModel, ModelContext, Predictions};
pub use review::{DEFAULT_MIN_PROBABILITY, ReviewEvent, ReviewSession};
pub use trainer::{DEFAULT_EVAL_TOP_N, Trainer, TrainingConfig, TrainingReport};
