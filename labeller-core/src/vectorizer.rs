//! Bag-of-words count vectorizer.
//!
//! Descriptions are lowercased, split into word tokens with a regex and
//! counted against a vocabulary learned from the training corpus. Terms are
//! kept in lexicographic order, so column indices are deterministic for a
//! given corpus.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Tokenization settings for [`CountVectorizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Regex whose matches become tokens.
    pub token_pattern: String,
    /// Lowercase text before tokenizing.
    pub lowercase: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            token_pattern: r"\w+".to_string(),
            lowercase: true,
        }
    }
}

/// Compiled tokenizer for a [`VectorizerConfig`].
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    lowercase: bool,
}

impl Tokenizer {
    pub fn new(config: &VectorizerConfig) -> Result<Self> {
        let pattern = Regex::new(&config.token_pattern).map_err(|e| {
            Error::invalid_config(format!("token pattern {:?}: {e}", config.token_pattern))
        })?;
        Ok(Self {
            pattern,
            lowercase: config.lowercase,
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        self.pattern
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Token → column mapping, sorted by token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    fn from_terms(terms: BTreeSet<String>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
        }
    }

    /// Column index of `term`, if it was seen during fit.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True if terms are strictly increasing, which `index_of` relies on.
    pub fn is_well_formed(&self) -> bool {
        self.terms.windows(2).all(|w| w[0] < w[1])
    }
}

/// Sparse token counts for one description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    dim: usize,
    /// `(column, count)` pairs sorted by column, counts > 0.
    entries: Vec<(usize, u32)>,
}

impl FeatureVector {
    /// Builds a vector from `(column, count)` pairs; zero counts are dropped
    /// and repeated columns are summed.
    pub fn from_counts(dim: usize, counts: impl IntoIterator<Item = (usize, u32)>) -> Result<Self> {
        let mut entries: Vec<(usize, u32)> = Vec::new();
        for (col, count) in counts {
            if col >= dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: col + 1,
                });
            }
            if count > 0 {
                entries.push((col, count));
            }
        }
        entries.sort_by_key(|(col, _)| *col);
        entries.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
        Ok(Self { dim, entries })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    pub fn get(&self, col: usize) -> u32 {
        self.entries
            .binary_search_by_key(&col, |(c, _)| *c)
            .map(|i| self.entries[i].1)
            .unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| u64::from(*n)).sum()
    }

    /// Dense copy, mostly useful for debugging and tests.
    pub fn to_dense(&self) -> Vec<u32> {
        let mut dense = vec![0; self.dim];
        for &(col, count) in &self.entries {
            dense[col] = count;
        }
        dense
    }
}

/// Count vectorizer: learns a vocabulary, then maps text to token counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountVectorizer {
    config: VectorizerConfig,
    vocabulary: Option<Vocabulary>,
}

impl CountVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            vocabulary: None,
        }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    pub fn vocabulary(&self) -> Result<&Vocabulary> {
        self.vocabulary
            .as_ref()
            .ok_or(Error::NotFitted("vectorizer"))
    }

    pub fn vocabulary_size(&self) -> Result<usize> {
        Ok(self.vocabulary()?.len())
    }

    /// Tokenize `text` the same way `fit` and `transform` do.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(Tokenizer::new(&self.config)?.tokenize(text))
    }

    /// Learn the vocabulary from `corpus`, replacing any previous one.
    pub fn fit<S: AsRef<str>>(&mut self, corpus: &[S]) -> Result<&Vocabulary> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus("corpus contains no documents".into()));
        }
        let tokenizer = Tokenizer::new(&self.config)?;

        let mut terms = BTreeSet::new();
        for doc in corpus {
            terms.extend(tokenizer.tokenize(doc.as_ref()));
        }
        if terms.is_empty() {
            return Err(Error::EmptyCorpus(format!(
                "{} documents yielded no tokens",
                corpus.len()
            )));
        }

        tracing::debug!(
            documents = corpus.len(),
            terms = terms.len(),
            "vectorizer fitted"
        );
        Ok(self.vocabulary.insert(Vocabulary::from_terms(terms)))
    }

    /// Map each text to its token counts. Unknown tokens are dropped.
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<FeatureVector>> {
        let vocabulary = self.vocabulary()?;
        let tokenizer = Tokenizer::new(&self.config)?;

        texts
            .iter()
            .map(|text| {
                let columns = tokenizer
                    .tokenize(text.as_ref())
                    .iter()
                    .filter_map(|t| vocabulary.index_of(t))
                    .map(|col| (col, 1))
                    .collect::<Vec<_>>();
                FeatureVector::from_counts(vocabulary.len(), columns)
            })
            .collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, corpus: &[S]) -> Result<Vec<FeatureVector>> {
        self.fit(corpus)?;
        self.transform(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(corpus: &[&str]) -> CountVectorizer {
        let mut v = CountVectorizer::default();
        v.fit(corpus).unwrap();
        v
    }

    #[test]
    fn test_vocabulary_is_sorted_and_lowercased() {
        let v = fitted(&["STARBUCKS #123", "Shell Oil", "starbucks"]);
        let vocab = v.vocabulary().unwrap();
        assert_eq!(vocab.terms(), &["123", "oil", "shell", "starbucks"]);
        assert_eq!(vocab.index_of("shell"), Some(2));
        assert_eq!(vocab.index_of("SHELL"), None);
        assert!(vocab.is_well_formed());
    }

    #[test]
    fn test_transform_counts_tokens() {
        let v = fitted(&["uber trip", "uber eats"]);
        let x = v.transform(&["UBER uber trip"]).unwrap();
        assert_eq!(x[0].dim(), 3);
        // eats, trip, uber
        assert_eq!(x[0].to_dense(), vec![0, 1, 2]);
        assert_eq!(x[0].total(), 3);
    }

    #[test]
    fn test_unknown_tokens_are_dropped() {
        let v = fitted(&["netflix.com"]);
        let x = v.transform(&["hulu.com", "spotify"]).unwrap();
        assert_eq!(x[0].entries(), &[(0, 1)]);
        assert!(x[1].is_zero());
        assert_eq!(x[1].dim(), v.vocabulary_size().unwrap());
    }

    #[test]
    fn test_training_rows_never_zero() {
        let corpus = [
            "STARBUCKS #123",
            "STARBUCKS #456",
            "SHELL OIL",
            "CHEVRON",
            "NETFLIX.COM",
        ];
        let mut v = CountVectorizer::default();
        let x = v.fit_transform(&corpus).unwrap();
        assert!(x.iter().all(|row| !row.is_zero()));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let v = fitted(&["amazon mktp", "amazon prime video"]);
        let a = v.transform(&["Amazon Prime"]).unwrap();
        let b = v.transform(&["Amazon Prime"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_corpus_errors() {
        let mut v = CountVectorizer::default();
        let empty: [&str; 0] = [];
        assert!(matches!(v.fit(&empty), Err(Error::EmptyCorpus(_))));
        assert!(matches!(v.fit(&["", "  ", "--"]), Err(Error::EmptyCorpus(_))));
        assert!(!v.is_fitted());
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let v = CountVectorizer::default();
        assert_eq!(
            v.transform(&["anything"]).unwrap_err(),
            Error::NotFitted("vectorizer")
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mut v = CountVectorizer::new(VectorizerConfig {
            token_pattern: "(".into(),
            lowercase: true,
        });
        assert!(matches!(v.fit(&["abc"]), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_case_sensitive_config() {
        let mut v = CountVectorizer::new(VectorizerConfig {
            token_pattern: r"\w+".into(),
            lowercase: false,
        });
        v.fit(&["Shell shell"]).unwrap();
        assert_eq!(v.vocabulary_size().unwrap(), 2);
    }

    #[test]
    fn test_from_counts_merges_and_checks_bounds() {
        let fv = FeatureVector::from_counts(4, [(2, 1), (0, 0), (2, 3), (1, 1)]).unwrap();
        assert_eq!(fv.entries(), &[(1, 1), (2, 4)]);
        assert_eq!(fv.get(2), 4);
        assert_eq!(fv.get(3), 0);
        assert!(matches!(
            FeatureVector::from_counts(2, [(2, 1)]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_round_trip_keeps_vocabulary() {
        let v = fitted(&["chevron", "shell oil"]);
        let json = serde_json::to_string(&v).unwrap();
        let back: CountVectorizer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert_eq!(
            back.transform(&["shell"]).unwrap(),
            v.transform(&["shell"]).unwrap()
        );
    }
}
