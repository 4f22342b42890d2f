//! Evaluation metrics and the scorers used by cross-validation.
//!
//! The metric functions are pure: they compare labels that were already
//! predicted. Scorers wrap a fitted classifier and held-out data so that
//! cross-validation can plug in either metric.

use crate::classifier::MultinomialNb;
use crate::error::{Error, Result};
use crate::ranker::top_n_batch;
use crate::vectorizer::FeatureVector;

fn check_lengths(truth: usize, predicted: usize) -> Result<()> {
    if truth == 0 {
        return Err(Error::invalid_data("no rows to score"));
    }
    if truth != predicted {
        return Err(Error::invalid_data(format!(
            "{truth} true labels but {predicted} predictions"
        )));
    }
    Ok(())
}

/// Fraction of rows whose predicted label equals the true label.
pub fn accuracy<T: AsRef<str>, P: AsRef<str>>(true_labels: &[T], predicted: &[P]) -> Result<f64> {
    check_lengths(true_labels.len(), predicted.len())?;
    let hits = true_labels
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t.as_ref() == p.as_ref())
        .count();
    Ok(hits as f64 / true_labels.len() as f64)
}

/// Fraction of rows whose true label appears anywhere in that row's top-N.
pub fn top_n_accuracy<T: AsRef<str>, P: AsRef<str>>(
    true_labels: &[T],
    predicted_top_n: &[Vec<P>],
) -> Result<f64> {
    check_lengths(true_labels.len(), predicted_top_n.len())?;
    let hits = true_labels
        .iter()
        .zip(predicted_top_n)
        .filter(|(t, row)| row.iter().any(|p| p.as_ref() == t.as_ref()))
        .count();
    Ok(hits as f64 / true_labels.len() as f64)
}

/// Scores a fitted classifier on held-out data.
pub trait Scorer {
    fn name(&self) -> String;

    fn score(&self, model: &MultinomialNb, x: &[FeatureVector], y: &[String]) -> Result<f64>;
}

/// Plain accuracy of the single best prediction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyScorer;

impl Scorer for AccuracyScorer {
    fn name(&self) -> String {
        "accuracy".to_string()
    }

    fn score(&self, model: &MultinomialNb, x: &[FeatureVector], y: &[String]) -> Result<f64> {
        let predicted = model.predict(x)?;
        accuracy(y, &predicted)
    }
}

/// Top-N accuracy of the ranked predictions.
#[derive(Debug, Clone, Copy)]
pub struct TopNScorer {
    pub n: usize,
}

impl Scorer for TopNScorer {
    fn name(&self) -> String {
        format!("top-{} accuracy", self.n)
    }

    fn score(&self, model: &MultinomialNb, x: &[FeatureVector], y: &[String]) -> Result<f64> {
        let proba = model.predict_proba(x)?;
        let batch = top_n_batch(model.classes()?, &proba, self.n)?;
        let ranked: Vec<Vec<&str>> = batch
            .iter()
            .map(|row| row.iter().map(|r| r.category.as_str()).collect())
            .collect();
        top_n_accuracy(y, &ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::CountVectorizer;

    #[test]
    fn test_accuracy() {
        let acc = accuracy(&["a", "b", "c", "d"], &["a", "x", "c", "y"]).unwrap();
        assert!((acc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_top_n_accuracy() {
        let truth = ["Gas", "Coffee", "Rent"];
        let predicted = vec![
            vec!["Coffee", "Gas"],
            vec!["Coffee"],
            vec!["Gas", "Coffee"],
        ];
        let acc = top_n_accuracy(&truth, &predicted).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_metric_length_checks() {
        let empty: [&str; 0] = [];
        assert!(accuracy(&empty, &empty).is_err());
        assert!(accuracy(&["a"], &["a", "b"]).is_err());
        let rows: Vec<Vec<&str>> = vec![];
        assert!(top_n_accuracy(&["a"], &rows).is_err());
    }

    #[test]
    fn test_scorers_on_training_data() {
        let names = ["uber trip", "lyft ride", "whole foods", "trader joes"];
        let y: Vec<String> = ["Transport", "Transport", "Groceries", "Groceries"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut vectorizer = CountVectorizer::default();
        let x = vectorizer.fit_transform(&names).unwrap();
        let mut model = MultinomialNb::default();
        model.fit(&x, &y).unwrap();

        assert_eq!(AccuracyScorer.score(&model, &x, &y).unwrap(), 1.0);
        let top2 = TopNScorer { n: 2 };
        assert_eq!(top2.score(&model, &x, &y).unwrap(), 1.0);
        assert_eq!(top2.name(), "top-2 accuracy");
    }
}
