//! Inference facade.
//!
//! [`ModelContext`] is the handle callers pass around: it loads the
//! persisted artifacts at most once and answers batched top-N queries. It is
//! read-only after load and can be shared between callers.

use serde::Serialize;
use std::sync::OnceLock;

use labeller_core::{CountVectorizer, Error as ModelError, MultinomialNb, RankedCategory, top_n_batch};

use crate::error::Result;
use crate::persistence::ArtifactStore;

/// Default number of suggestions per description.
pub const DEFAULT_TOP_N: usize = 5;

/// A fitted (vectorizer, classifier) pair.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub vectorizer: CountVectorizer,
    pub classifier: MultinomialNb,
}

impl LoadedModel {
    /// Rank the `n` most likely categories for every description.
    pub fn predict_categories<S: AsRef<str>>(&self, descriptions: &[S], n: usize) -> Result<Predictions> {
        let x = self.vectorizer.transform(descriptions)?;
        let proba = self.classifier.predict_proba(&x)?;
        let ranked = top_n_batch(self.classifier.classes()?, &proba, n)?;
        Ok(Predictions::from_ranked(ranked))
    }
}

/// Top-N labels and probabilities, one row per input description.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Predictions {
    pub categories: Vec<Vec<String>>,
    pub probabilities: Vec<Vec<f64>>,
}

impl Predictions {
    fn from_ranked(ranked: Vec<Vec<RankedCategory>>) -> Self {
        let mut out = Predictions::default();
        for row in ranked {
            let (labels, probs): (Vec<String>, Vec<f64>) =
                row.into_iter().map(|r| (r.category, r.probability)).unzip();
            out.categories.push(labels);
            out.probabilities.push(probs);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Ranked suggestions for one input row.
    pub fn row(&self, index: usize) -> Option<Vec<RankedCategory>> {
        let labels = self.categories.get(index)?;
        let probs = self.probabilities.get(index)?;
        Some(
            labels
                .iter()
                .zip(probs)
                .map(|(category, probability)| RankedCategory {
                    category: category.clone(),
                    probability: *probability,
                })
                .collect(),
        )
    }

    /// Best label for one input row.
    pub fn top(&self, index: usize) -> Option<&str> {
        self.categories.get(index)?.first().map(String::as_str)
    }
}

/// Explicit handle owning the loaded model for a session.
#[derive(Debug)]
pub struct ModelContext {
    store: Option<ArtifactStore>,
    model: OnceLock<LoadedModel>,
}

impl ModelContext {
    /// A context that will load from `store` on the first [`load_once`](Self::load_once).
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store: Some(store),
            model: OnceLock::new(),
        }
    }

    /// A context around an in-memory fitted model.
    pub fn from_fitted(vectorizer: CountVectorizer, classifier: MultinomialNb) -> Result<Self> {
        vectorizer.vocabulary()?;
        classifier.classes()?;
        Ok(Self {
            store: None,
            model: OnceLock::from(LoadedModel {
                vectorizer,
                classifier,
            }),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Load the artifacts if this context has not done so yet.
    /// Later calls return the cached model without touching storage.
    pub fn load_once(&self) -> Result<&LoadedModel> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }
        let store = self.store.as_ref().ok_or(ModelError::NotFitted("model"))?;
        let (vectorizer, classifier) = store.load()?;
        Ok(self.model.get_or_init(|| LoadedModel {
            vectorizer,
            classifier,
        }))
    }

    /// The loaded model, or `NotFitted` if nothing was loaded yet.
    pub fn model(&self) -> Result<&LoadedModel> {
        Ok(self.model.get().ok_or(ModelError::NotFitted("model"))?)
    }

    /// Category labels known to the loaded model, in model order.
    pub fn classes(&self) -> Result<&[String]> {
        Ok(self.model()?.classifier.classes()?)
    }

    /// Top-`n` categories and probabilities per description, in input order.
    pub fn predict_categories<S: AsRef<str>>(&self, descriptions: &[S], n: usize) -> Result<Predictions> {
        let predictions = self.model()?.predict_categories(descriptions, n)?;
        tracing::debug!(rows = predictions.len(), n, "predicted categories");
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn context() -> ModelContext {
        let names = ["STARBUCKS #123", "STARBUCKS #456", "SHELL OIL", "CHEVRON", "NETFLIX.COM"];
        let labels = ["Coffee", "Coffee", "Gas", "Gas", "Subscriptions"];
        let mut vectorizer = CountVectorizer::default();
        let x = vectorizer.fit_transform(&names).unwrap();
        let mut classifier = MultinomialNb::default();
        classifier.fit(&x, &labels).unwrap();
        ModelContext::from_fitted(vectorizer, classifier).unwrap()
    }

    #[test]
    fn test_predictions_are_row_aligned() {
        let ctx = context();
        let p = ctx
            .predict_categories(&["STARBUCKS DOWNTOWN", "CHEVRON 0042", "NETFLIX"], 2)
            .unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.top(0), Some("Coffee"));
        assert_eq!(p.top(1), Some("Gas"));
        assert_eq!(p.top(2), Some("Subscriptions"));
        assert!(p.categories.iter().all(|row| row.len() == 2));
        assert_eq!(p.row(0).unwrap()[0].category, "Coffee");
        assert!(p.row(3).is_none());
    }

    #[test]
    fn test_categories_come_from_classes() {
        let ctx = context();
        let classes = ctx.classes().unwrap().to_vec();
        let p = ctx.predict_categories(&["anything at all"], 10).unwrap();
        assert_eq!(p.categories[0].len(), classes.len());
        assert!(p.categories[0].iter().all(|c| classes.contains(c)));
    }

    #[test]
    fn test_prediction_is_idempotent() {
        let ctx = context();
        let inputs = ["STARBUCKS", "SHELL", "HULU"];
        assert_eq!(
            ctx.predict_categories(&inputs, 3).unwrap(),
            ctx.predict_categories(&inputs, 3).unwrap()
        );
    }

    #[test]
    fn test_empty_batch() {
        let ctx = context();
        let none: [&str; 0] = [];
        assert!(ctx.predict_categories(&none, 5).unwrap().is_empty());
    }

    #[test]
    fn test_not_fitted_before_load() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ModelContext::new(ArtifactStore::new(dir.path()));
        let err = ctx.predict_categories(&["STARBUCKS"], 5).unwrap_err();
        assert!(err.is_not_fitted());
        assert!(!ctx.is_loaded());
    }

    #[test]
    fn test_load_once_surfaces_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ModelContext::new(ArtifactStore::new(dir.path()));
        assert!(matches!(ctx.load_once(), Err(Error::ArtifactNotFound(_))));
        assert!(!ctx.is_loaded());
    }

    #[test]
    fn test_from_fitted_rejects_unfitted() {
        let err = ModelContext::from_fitted(CountVectorizer::default(), MultinomialNb::default())
            .unwrap_err();
        assert!(err.is_not_fitted());
    }
}
