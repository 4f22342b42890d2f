//! Top-N selection over classifier probability rows.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// One ranked suggestion for a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCategory {
    pub category: String,
    pub probability: f64,
}

/// The `n` most probable categories of one row, most probable first.
///
/// `probabilities` is positional over `classes` and must have the same
/// length. Ties keep class order, and `n` larger than the class count
/// returns every class.
pub fn top_n(classes: &[String], probabilities: &[f64], n: usize) -> Result<Vec<RankedCategory>> {
    if probabilities.len() != classes.len() {
        return Err(Error::DimensionMismatch {
            expected: classes.len(),
            actual: probabilities.len(),
        });
    }
    let mut order: Vec<usize> = (0..classes.len()).collect();
    // Stable sort: equal probabilities stay in class order.
    order.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(Ordering::Equal)
    });
    Ok(order
        .into_iter()
        .take(n)
        .map(|i| RankedCategory {
            category: classes[i].clone(),
            probability: probabilities[i],
        })
        .collect())
}

/// [`top_n`] applied to every row, preserving row order.
pub fn top_n_batch(classes: &[String], rows: &[Vec<f64>], n: usize) -> Result<Vec<Vec<RankedCategory>>> {
    rows.iter().map(|row| top_n(classes, row, n)).collect()
}

/// Labels of a ranked row, in rank order.
pub fn labels(ranked: &[RankedCategory]) -> Vec<String> {
    ranked.iter().map(|r| r.category.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        ["Coffee", "Gas", "Groceries", "Subscriptions"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_sorted_descending() {
        let ranked = top_n(&classes(), &[0.1, 0.5, 0.15, 0.25], 3).unwrap();
        let got: Vec<&str> = ranked.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(got, vec!["Gas", "Subscriptions", "Groceries"]);
        for w in ranked.windows(2) {
            assert!(w[0].probability >= w[1].probability);
        }
    }

    #[test]
    fn test_ties_keep_class_order() {
        let ranked = top_n(&classes(), &[0.25, 0.25, 0.25, 0.25], 4).unwrap();
        assert_eq!(labels(&ranked), classes());
    }

    #[test]
    fn test_zero_n_is_empty() {
        assert!(top_n(&classes(), &[0.1, 0.2, 0.3, 0.4], 0).unwrap().is_empty());
    }

    #[test]
    fn test_large_n_returns_all_once() {
        let ranked = top_n(&classes(), &[0.1, 0.2, 0.3, 0.4], 50).unwrap();
        assert_eq!(ranked.len(), 4);
        let mut seen = labels(&ranked);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_batch_preserves_rows() {
        let rows = vec![vec![0.7, 0.1, 0.1, 0.1], vec![0.1, 0.1, 0.1, 0.7]];
        let ranked = top_n_batch(&classes(), &rows, 1).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0][0].category, "Coffee");
        assert_eq!(ranked[1][0].category, "Subscriptions");
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = top_n(&classes(), &[0.6, 0.4], 4).unwrap_err();
        assert_eq!(err, Error::DimensionMismatch { expected: 4, actual: 2 });

        let rows = vec![vec![0.25; 4], vec![0.5, 0.5]];
        assert!(top_n_batch(&classes(), &rows, 2).is_err());
    }
}
