//! Training driver: CSV in, evaluated and persisted model out.
//!
//! Stages run in a fixed order and any error before persistence aborts the
//! run with nothing written. Cross-validation is the exception: its failures
//! are reported but the full-data model is still saved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use labeller_core::{
    AccuracyScorer, CountVectorizer, CrossValidationReport, DEFAULT_FOLDS, Error as ModelError,
    FeatureVector, MultinomialNb, NaiveBayesConfig, Scorer, TopNScorer, VectorizerConfig, accuracy,
    cross_validate, top_n_accuracy, top_n_batch,
};
use labeller_ingest::{LabeledDescription, read_labeled_csv};

use crate::error::Result;
use crate::persistence::{ArtifactPaths, ArtifactStore};
use crate::predictor::LoadedModel;

/// Top-N used for training-time evaluation.
pub const DEFAULT_EVAL_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub vectorizer: VectorizerConfig,
    pub classifier: NaiveBayesConfig,
    /// N for the top-N accuracy metrics.
    pub top_n: usize,
    /// Cross-validation folds.
    pub folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            classifier: NaiveBayesConfig::default(),
            top_n: DEFAULT_EVAL_TOP_N,
            folds: DEFAULT_FOLDS,
        }
    }
}

/// Everything a training run measured and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub samples: usize,
    pub categories: Vec<String>,
    pub vocabulary_size: usize,
    /// Accuracy of the single best label on the training set.
    pub accuracy: f64,
    pub top_n: usize,
    /// Top-N accuracy on the training set.
    pub top_n_accuracy: f64,
    pub cv_accuracy: std::result::Result<CrossValidationReport, String>,
    pub cv_top_n_accuracy: std::result::Result<CrossValidationReport, String>,
    pub artifacts: ArtifactPaths,
}

/// A freshly fitted model plus the training matrix it was fitted on.
struct Fitted {
    model: LoadedModel,
    x: Vec<FeatureVector>,
    y: Vec<String>,
}

pub struct Trainer {
    config: TrainingConfig,
    store: ArtifactStore,
}

impl Trainer {
    pub fn new(config: TrainingConfig, store: ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Full run from a CSV with `Name` and `Category` columns.
    pub fn run(&self, data_path: &Path) -> Result<TrainingReport> {
        tracing::info!(path = %data_path.display(), "loading training data");
        let rows = read_labeled_csv(data_path)?;
        self.train_on(&rows)
    }

    /// Fit vectorizer and classifier on every row, without evaluating or saving.
    pub fn fit(&self, rows: &[LabeledDescription]) -> Result<LoadedModel> {
        Ok(self.fit_inner(rows)?.model)
    }

    fn fit_inner(&self, rows: &[LabeledDescription]) -> Result<Fitted> {
        if self.config.top_n == 0 {
            return Err(ModelError::invalid_config("top_n must be at least 1").into());
        }
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let y: Vec<String> = rows.iter().map(|r| r.category.clone()).collect();

        tracing::info!(rows = rows.len(), "fitting vectorizer");
        let mut vectorizer = CountVectorizer::new(self.config.vectorizer.clone());
        vectorizer.fit(&names)?;
        let x = vectorizer.transform(&names)?;

        tracing::info!("fitting classifier");
        let mut classifier = MultinomialNb::new(self.config.classifier);
        classifier.fit(&x, &y)?;

        Ok(Fitted {
            model: LoadedModel {
                vectorizer,
                classifier,
            },
            x,
            y,
        })
    }

    fn cross_validate(
        &self,
        x: &[FeatureVector],
        y: &[String],
        scorer: &dyn Scorer,
    ) -> std::result::Result<CrossValidationReport, String> {
        match cross_validate(x, y, self.config.folds, self.config.classifier, scorer) {
            Ok(report) => {
                tracing::info!(
                    scorer = %report.scorer,
                    mean = ?report.mean(),
                    failed_folds = report.failed_folds(),
                    "cross-validation finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(scorer = %scorer.name(), error = %e, "cross-validation skipped");
                Err(e.to_string())
            }
        }
    }

    /// Fit, evaluate, cross-validate and persist.
    pub fn train_on(&self, rows: &[LabeledDescription]) -> Result<TrainingReport> {
        let Fitted { model, x, y } = self.fit_inner(rows)?;
        let classes = model.classifier.classes()?;

        let predicted = model.classifier.predict(&x)?;
        let train_accuracy = accuracy(&y, &predicted)?;

        let proba = model.classifier.predict_proba(&x)?;
        let ranked: Vec<Vec<String>> = top_n_batch(classes, &proba, self.config.top_n)?
            .into_iter()
            .map(|row| row.into_iter().map(|r| r.category).collect())
            .collect();
        let train_top_n = top_n_accuracy(&y, &ranked)?;
        tracing::info!(
            accuracy = train_accuracy,
            top_n = self.config.top_n,
            top_n_accuracy = train_top_n,
            "training-set evaluation"
        );

        let cv_accuracy = self.cross_validate(&x, &y, &AccuracyScorer);
        let cv_top_n_accuracy = self.cross_validate(&x, &y, &TopNScorer { n: self.config.top_n });

        let artifacts = self.store.save(&model.vectorizer, &model.classifier)?;

        Ok(TrainingReport {
            trained_at: Utc::now(),
            samples: rows.len(),
            categories: classes.to_vec(),
            vocabulary_size: model.vectorizer.vocabulary_size()?,
            accuracy: train_accuracy,
            top_n: self.config.top_n,
            top_n_accuracy: train_top_n,
            cv_accuracy,
            cv_top_n_accuracy,
            artifacts,
        })
    }
}
