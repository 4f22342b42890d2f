//! labeller-ingest: transaction record types and CSV readers/writers for
//! training data and review tables.

pub mod error;
pub mod parsers;
pub mod types;

pub use error::{IngestError, Result};
pub use parsers::labeled_csv::{parse_labeled_csv, read_labeled_csv};
pub use parsers::review_csv::{TransactionBatch, parse_review_csv, read_review_csv};
pub use types::{LabeledDescription, TransactionRecord};
