//! Reviewer state for a batch of transactions.
//!
//! Front ends never mutate rows directly: they send [`ReviewEvent`]s to
//! [`ReviewSession::apply`], the single place where categories and flags
//! change.

use labeller_core::RankedCategory;
use labeller_ingest::{TransactionBatch, TransactionRecord};

use crate::error::{Error, Result};
use crate::predictor::{ModelContext, Predictions};

/// Suggestions below this probability are hidden by default.
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.05;

/// A reviewer action on one row.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewEvent {
    /// Accept a suggestion or override with any category.
    SelectCategory { row: usize, category: String },
    SetFlag { row: usize, flagged: bool },
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    batch: TransactionBatch,
    suggestions: Vec<Vec<RankedCategory>>,
    /// Model categories, sorted for display.
    categories: Vec<String>,
}

impl ReviewSession {
    /// Build a session from a batch and its predictions. Rows without a
    /// category get their top suggestion.
    pub fn new(batch: TransactionBatch, predictions: &Predictions, categories: &[String]) -> Result<Self> {
        if predictions.len() != batch.len() {
            return Err(Error::PredictionMismatch {
                rows: batch.len(),
                predictions: predictions.len(),
            });
        }
        let suggestions = (0..predictions.len())
            .map(|i| predictions.row(i).unwrap_or_default())
            .collect();
        let mut categories = categories.to_vec();
        categories.sort();

        let mut session = Self {
            batch,
            suggestions,
            categories,
        };
        let prefilled = session.prefill();
        tracing::debug!(rows = session.len(), prefilled, "review session ready");
        Ok(session)
    }

    /// Predict the batch with `ctx` and start a session over it.
    pub fn start(ctx: &ModelContext, batch: TransactionBatch, n: usize) -> Result<Self> {
        let predictions = ctx.predict_categories(&batch.names(), n)?;
        Self::new(batch, &predictions, ctx.classes()?)
    }

    fn prefill(&mut self) -> usize {
        let mut filled = 0;
        for (record, suggestions) in self.batch.records_mut().iter_mut().zip(&self.suggestions) {
            if record.is_labeled() {
                continue;
            }
            if let Some(best) = suggestions.first() {
                record.category = best.category.clone();
                filled += 1;
            }
        }
        filled
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.len() {
            return Err(Error::RowOutOfRange {
                row,
                rows: self.len(),
            });
        }
        Ok(())
    }

    /// Apply one reviewer action.
    pub fn apply(&mut self, event: ReviewEvent) -> Result<()> {
        match event {
            ReviewEvent::SelectCategory { row, category } => {
                self.check_row(row)?;
                if self.categories.binary_search(&category).is_err() {
                    tracing::warn!(row, category = %category, "category is not known to the model");
                }
                self.batch.records_mut()[row].category = category;
            }
            ReviewEvent::SetFlag { row, flagged } => {
                self.check_row(row)?;
                self.batch.records_mut()[row].flag = flagged;
            }
        }
        Ok(())
    }

    pub fn record(&self, row: usize) -> Result<&TransactionRecord> {
        self.check_row(row)?;
        Ok(&self.batch.records()[row])
    }

    /// Suggestions for `row` with probability at least `min_probability`.
    pub fn suggestions(&self, row: usize, min_probability: f64) -> Result<Vec<&RankedCategory>> {
        self.check_row(row)?;
        Ok(self.suggestions[row]
            .iter()
            .filter(|s| s.probability >= min_probability)
            .collect())
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn flagged_rows(&self) -> Vec<usize> {
        self.batch
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.flag)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn batch(&self) -> &TransactionBatch {
        &self.batch
    }

    pub fn into_batch(self) -> TransactionBatch {
        self.batch
    }
}
