//! Stratified k-fold cross-validation.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classifier::{MultinomialNb, NaiveBayesConfig};
use crate::error::{Error, Result};
use crate::metrics::Scorer;
use crate::vectorizer::FeatureVector;

/// Number of folds used when none is configured.
pub const DEFAULT_FOLDS: usize = 5;

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FoldOutcome {
    Scored(f64),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldScore {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub outcome: FoldOutcome,
}

/// Scores of every fold for one scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    pub scorer: String,
    pub folds: Vec<FoldScore>,
    /// Classes with fewer members than there are folds.
    pub warnings: Vec<String>,
}

impl CrossValidationReport {
    pub fn scores(&self) -> Vec<f64> {
        self.folds
            .iter()
            .filter_map(|f| match f.outcome {
                FoldOutcome::Scored(s) => Some(s),
                FoldOutcome::Failed(_) => None,
            })
            .collect()
    }

    pub fn failed_folds(&self) -> usize {
        self.folds
            .iter()
            .filter(|f| matches!(f.outcome, FoldOutcome::Failed(_)))
            .count()
    }

    /// Mean over successful folds; `None` when every fold failed.
    pub fn mean(&self) -> Option<f64> {
        let scores = self.scores();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Population standard deviation over successful folds.
    pub fn std_dev(&self) -> Option<f64> {
        let scores = self.scores();
        let mean = self.mean()?;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        Some(var.sqrt())
    }
}

/// Test-fold index for each sample.
///
/// Members of each class are dealt round-robin over the folds, continuing
/// where the previous class stopped, so fold sizes differ by at most one and
/// every class is spread as evenly as its size allows. No shuffling.
pub fn stratified_folds<S: AsRef<str>>(y: &[S], k: usize) -> Result<Vec<usize>> {
    if k < 2 {
        return Err(Error::CrossValidation(format!("need at least 2 folds, got {k}")));
    }
    if y.len() < k {
        return Err(Error::CrossValidation(format!(
            "cannot split {} samples into {k} folds",
            y.len()
        )));
    }

    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in y.iter().enumerate() {
        by_class.entry(label.as_ref()).or_default().push(i);
    }

    let mut assignment = vec![0; y.len()];
    let mut next = 0;
    for members in by_class.values() {
        for &i in members {
            assignment[i] = next % k;
            next += 1;
        }
    }
    Ok(assignment)
}

fn run_fold(
    x: &[FeatureVector],
    y: &[String],
    train: &[usize],
    test: &[usize],
    config: NaiveBayesConfig,
    scorer: &dyn Scorer,
) -> Result<f64> {
    if train.is_empty() || test.is_empty() {
        return Err(Error::invalid_data("empty train or test split"));
    }
    let x_train: Vec<FeatureVector> = train.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<&str> = train.iter().map(|&i| y[i].as_str()).collect();
    let x_test: Vec<FeatureVector> = test.iter().map(|&i| x[i].clone()).collect();
    let y_test: Vec<String> = test.iter().map(|&i| y[i].clone()).collect();

    let mut model = MultinomialNb::new(config);
    model.fit(&x_train, &y_train)?;
    scorer.score(&model, &x_test, &y_test)
}

/// Fit a fresh classifier per fold and score it on the held-out fold.
///
/// Set-up problems (too few samples, mismatched inputs) are errors. Failures
/// inside a fold are recorded in the report instead.
pub fn cross_validate(
    x: &[FeatureVector],
    y: &[String],
    k: usize,
    config: NaiveBayesConfig,
    scorer: &dyn Scorer,
) -> Result<CrossValidationReport> {
    if x.len() != y.len() {
        return Err(Error::CrossValidation(format!(
            "{} feature vectors but {} labels",
            x.len(),
            y.len()
        )));
    }
    let assignment = stratified_folds(y, k)?;

    let mut class_sizes: BTreeMap<&str, usize> = BTreeMap::new();
    for label in y {
        *class_sizes.entry(label.as_str()).or_insert(0) += 1;
    }
    let warnings: Vec<String> = class_sizes
        .iter()
        .filter(|(_, n)| **n < k)
        .map(|(label, n)| format!("class {label:?} has {n} members, fewer than {k} folds"))
        .collect();
    for w in &warnings {
        tracing::warn!("{w}");
    }

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let (test, train): (Vec<usize>, Vec<usize>) =
            (0..y.len()).partition(|&i| assignment[i] == fold);

        let outcome = match run_fold(x, y, &train, &test, config, scorer) {
            Ok(score) => FoldOutcome::Scored(score),
            Err(e) => {
                tracing::warn!(fold, error = %e, "cross-validation fold failed");
                FoldOutcome::Failed(e.to_string())
            }
        };
        folds.push(FoldScore {
            fold,
            train_size: train.len(),
            test_size: test.len(),
            outcome,
        });
    }

    Ok(CrossValidationReport {
        scorer: scorer.name(),
        folds,
        warnings,
    })
}
