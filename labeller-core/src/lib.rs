//! labeller-core: bag-of-words vectorizer, multinomial naive Bayes,
//! top-N ranking and evaluation for transaction categorisation.

pub mod classifier;
pub mod cross_validation;
pub mod error;
pub mod metrics;
pub mod ranker;
pub mod vectorizer;

pub use classifier::{MultinomialNb, NaiveBayesConfig};
pub use cross_validation::{
    CrossValidationReport, DEFAULT_FOLDS, FoldOutcome, FoldScore, cross_validate, stratified_folds,
};
pub use error::{Error, Result};
pub use metrics::{AccuracyScorer, Scorer, TopNScorer, accuracy, top_n_accuracy};
pub use ranker::{RankedCategory, top_n, top_n_batch};
pub use vectorizer::{CountVectorizer, FeatureVector, Tokenizer, VectorizerConfig, Vocabulary};
