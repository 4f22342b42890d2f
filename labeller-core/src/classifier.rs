//! Multinomial naive Bayes over token-count feature vectors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::vectorizer::FeatureVector;

/// Smoothing settings for [`MultinomialNb`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesConfig {
    /// Additive (Laplace) smoothing constant. Must be finite and > 0.
    pub alpha: f64,
}

impl Default for NaiveBayesConfig {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl NaiveBayesConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(Error::invalid_config(format!(
                "alpha must be a positive finite number, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    /// Sorted, unique category labels; positions index every other table.
    classes: Vec<String>,
    class_counts: Vec<u64>,
    class_log_prior: Vec<f64>,
    /// `feature_log_prob[class][column]`
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
}

/// Multinomial naive Bayes classifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultinomialNb {
    config: NaiveBayesConfig,
    state: Option<FittedState>,
}

impl MultinomialNb {
    pub fn new(config: NaiveBayesConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &NaiveBayesConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(Error::NotFitted("classifier"))
    }

    /// Category labels in the order used by [`predict_proba`](Self::predict_proba).
    pub fn classes(&self) -> Result<&[String]> {
        Ok(&self.state()?.classes)
    }

    /// Number of feature columns the classifier was trained on.
    pub fn n_features(&self) -> Result<usize> {
        Ok(self.state()?.n_features)
    }

    /// Training samples seen per class, aligned with [`classes`](Self::classes).
    pub fn class_counts(&self) -> Result<&[u64]> {
        Ok(&self.state()?.class_counts)
    }

    /// Estimate priors and smoothed token likelihoods from `x` and labels `y`.
    pub fn fit<S: AsRef<str>>(&mut self, x: &[FeatureVector], y: &[S]) -> Result<()> {
        self.config.validate()?;

        if x.is_empty() {
            return Err(Error::invalid_data("no training samples"));
        }
        if x.len() != y.len() {
            return Err(Error::invalid_data(format!(
                "{} feature vectors but {} labels",
                x.len(),
                y.len()
            )));
        }
        if let Some(row) = y.iter().position(|label| label.as_ref().trim().is_empty()) {
            return Err(Error::invalid_data(format!("empty category label at row {row}")));
        }

        let n_features = x[0].dim();
        if n_features == 0 {
            return Err(Error::invalid_data("feature vectors have zero columns"));
        }
        if let Some(bad) = x.iter().find(|row| row.dim() != n_features) {
            return Err(Error::DimensionMismatch {
                expected: n_features,
                actual: bad.dim(),
            });
        }

        let classes: Vec<String> = y
            .iter()
            .map(|label| label.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut class_counts = vec![0u64; classes.len()];
        let mut feature_counts = vec![vec![0u64; n_features]; classes.len()];
        for (row, label) in x.iter().zip(y) {
            let c = position[label.as_ref()];
            class_counts[c] += 1;
            for &(col, count) in row.entries() {
                feature_counts[c][col] += u64::from(count);
            }
        }

        let n_samples = x.len() as f64;
        let class_log_prior = class_counts
            .iter()
            .map(|&n| (n as f64).ln() - n_samples.ln())
            .collect();

        let alpha = self.config.alpha;
        let feature_log_prob = feature_counts
            .iter()
            .map(|counts| {
                let total: u64 = counts.iter().sum();
                let denom = (total as f64 + alpha * n_features as f64).ln();
                counts
                    .iter()
                    .map(|&n| (n as f64 + alpha).ln() - denom)
                    .collect()
            })
            .collect();

        tracing::debug!(
            samples = x.len(),
            classes = classes.len(),
            features = n_features,
            alpha,
            "classifier fitted"
        );

        self.state = Some(FittedState {
            classes,
            class_counts,
            class_log_prior,
            feature_log_prob,
            n_features,
        });
        Ok(())
    }

    fn joint_log_likelihood(state: &FittedState, row: &FeatureVector) -> Result<Vec<f64>> {
        if row.dim() != state.n_features {
            return Err(Error::DimensionMismatch {
                expected: state.n_features,
                actual: row.dim(),
            });
        }
        Ok(state
            .class_log_prior
            .iter()
            .zip(&state.feature_log_prob)
            .map(|(prior, log_probs)| {
                prior
                    + row
                        .entries()
                        .iter()
                        .map(|&(col, count)| f64::from(count) * log_probs[col])
                        .sum::<f64>()
            })
            .collect())
    }

    /// Per-row probability over [`classes`](Self::classes); each row sums to 1.
    pub fn predict_proba(&self, x: &[FeatureVector]) -> Result<Vec<Vec<f64>>> {
        let state = self.state()?;
        x.iter()
            .map(|row| {
                let jll = Self::joint_log_likelihood(state, row)?;
                let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let log_norm = max + jll.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
                Ok(jll.iter().map(|v| (v - log_norm).exp()).collect())
            })
            .collect()
    }

    /// Most likely label per row. Ties go to the earlier class.
    pub fn predict(&self, x: &[FeatureVector]) -> Result<Vec<String>> {
        let state = self.state()?;
        x.iter()
            .map(|row| {
                let jll = Self::joint_log_likelihood(state, row)?;
                let mut best = 0;
                for (i, v) in jll.iter().enumerate() {
                    if *v > jll[best] {
                        best = i;
                    }
                }
                Ok(state.classes[best].clone())
            })
            .collect()
    }

    /// Structural sanity check for a deserialized model.
    pub fn is_well_formed(&self) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let k = state.classes.len();
        k > 0
            && state.classes.windows(2).all(|w| w[0] < w[1])
            && state.class_counts.len() == k
            && state.class_log_prior.len() == k
            && state.feature_log_prob.len() == k
            && state
                .feature_log_prob
                .iter()
                .all(|row| row.len() == state.n_features && row.iter().all(|v| v.is_finite()))
            && state.class_log_prior.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::CountVectorizer;

    const CORPUS: [(&str, &str); 5] = [
        ("STARBUCKS #123", "Coffee"),
        ("STARBUCKS #456", "Coffee"),
        ("SHELL OIL", "Gas"),
        ("CHEVRON", "Gas"),
        ("NETFLIX.COM", "Subscriptions"),
    ];

    fn trained() -> (CountVectorizer, MultinomialNb) {
        let names: Vec<&str> = CORPUS.iter().map(|(n, _)| *n).collect();
        let labels: Vec<&str> = CORPUS.iter().map(|(_, c)| *c).collect();
        let mut vectorizer = CountVectorizer::default();
        let x = vectorizer.fit_transform(&names).unwrap();
        let mut model = MultinomialNb::default();
        model.fit(&x, &labels).unwrap();
        (vectorizer, model)
    }

    #[test]
    fn test_classes_are_sorted() {
        let (_, model) = trained();
        assert_eq!(model.classes().unwrap(), &["Coffee", "Gas", "Subscriptions"]);
        assert_eq!(model.class_counts().unwrap(), &[2, 2, 1]);
        assert!(model.is_well_formed());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (vectorizer, model) = trained();
        let x = vectorizer
            .transform(&["STARBUCKS DOWNTOWN", "SHELL", "unknown merchant", ""])
            .unwrap();
        for row in model.predict_proba(&x).unwrap() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "row sums to {sum}");
            assert!(row.iter().all(|p| *p > 0.0));
        }
    }

    #[test]
    fn test_shared_token_wins() {
        let (vectorizer, model) = trained();
        let x = vectorizer.transform(&["STARBUCKS DOWNTOWN"]).unwrap();
        let proba = &model.predict_proba(&x).unwrap()[0];
        // Coffee, Gas, Subscriptions
        assert!(proba[0] > proba[1]);
        assert!(proba[0] > proba[2]);
        assert_eq!(model.predict(&x).unwrap(), vec!["Coffee".to_string()]);
    }

    #[test]
    fn test_unseen_input_falls_back_to_priors() {
        let (vectorizer, model) = trained();
        let x = vectorizer.transform(&["zzz"]).unwrap();
        let proba = &model.predict_proba(&x).unwrap()[0];
        assert!((proba[0] - 0.4).abs() < 1e-9);
        assert!((proba[1] - 0.4).abs() < 1e-9);
        assert!((proba[2] - 0.2).abs() < 1e-9);
        // Coffee and Gas tie; the earlier class wins.
        assert_eq!(model.predict(&x).unwrap()[0], "Coffee");
    }

    #[test]
    fn test_fit_rejects_bad_data() {
        let (vectorizer, _) = trained();
        let x = vectorizer.transform(&["shell", "chevron"]).unwrap();
        let mut model = MultinomialNb::default();

        assert!(matches!(
            model.fit(&x, &["Gas"]),
            Err(Error::InvalidTrainingData(_))
        ));
        assert!(matches!(
            model.fit(&x, &["Gas", "  "]),
            Err(Error::InvalidTrainingData(_))
        ));
        let none: [&str; 0] = [];
        assert!(matches!(model.fit(&[], &none), Err(Error::InvalidTrainingData(_))));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_fit_rejects_mixed_dimensions() {
        let a = FeatureVector::from_counts(3, [(0, 1)]).unwrap();
        let b = FeatureVector::from_counts(4, [(0, 1)]).unwrap();
        let mut model = MultinomialNb::default();
        assert_eq!(
            model.fit(&[a, b], &["A", "B"]).unwrap_err(),
            Error::DimensionMismatch { expected: 3, actual: 4 }
        );
    }

    #[test]
    fn test_invalid_alpha() {
        let (vectorizer, _) = trained();
        let x = vectorizer.transform(&["shell"]).unwrap();
        for alpha in [0.0, -1.0, f64::NAN] {
            let mut model = MultinomialNb::new(NaiveBayesConfig { alpha });
            assert!(matches!(model.fit(&x, &["Gas"]), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_unfitted_errors() {
        let model = MultinomialNb::default();
        assert_eq!(model.classes().unwrap_err(), Error::NotFitted("classifier"));
        let x = [FeatureVector::from_counts(1, [(0, 1)]).unwrap()];
        assert!(matches!(model.predict_proba(&x), Err(Error::NotFitted(_))));
        assert!(!model.is_well_formed());
    }

    #[test]
    fn test_predict_checks_dimension() {
        let (_, model) = trained();
        let x = [FeatureVector::from_counts(2, [(0, 1)]).unwrap()];
        assert!(matches!(
            model.predict_proba(&x),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_round_trip_is_exact() {
        let (vectorizer, model) = trained();
        let json = serde_json::to_string(&model).unwrap();
        let back: MultinomialNb = serde_json::from_str(&json).unwrap();
        assert_eq!(back.classes().unwrap(), model.classes().unwrap());

        let x = vectorizer.transform(&["starbucks", "chevron shell"]).unwrap();
        assert_eq!(back.predict_proba(&x).unwrap(), model.predict_proba(&x).unwrap());
    }
}
