//! Regression error metrics
//!
//! Metrics are diagnostics only; training never fails on their values.

use carprice_core::fixed::from_fixed;
use carprice_core::forest::ForestModel;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Error metrics on both partitions, in target units (dollars).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub train_rmse: f64,
    pub test_rmse: f64,
    pub train_mae: f64,
    pub test_mae: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl Metrics {
    pub fn evaluate(model: &ForestModel, train: &Dataset, test: &Dataset) -> Self {
        let (train_rmse, train_mae) = errors(model, train);
        let (test_rmse, test_mae) = errors(model, test);
        Self {
            train_rmse,
            test_rmse,
            train_mae,
            test_mae,
            train_rows: train.len(),
            test_rows: test.len(),
        }
    }

    /// Named error values, for bundle metadata
    pub fn to_pairs(&self) -> Vec<(String, f64)> {
        vec![
            ("train_rmse".to_string(), self.train_rmse),
            ("test_rmse".to_string(), self.test_rmse),
            ("train_mae".to_string(), self.train_mae),
            ("test_mae".to_string(), self.test_mae),
        ]
    }
}

fn errors(model: &ForestModel, data: &Dataset) -> (f64, f64) {
    let predictions: Vec<f64> = data.features.iter().map(|row| model.predict(row)).collect();
    let actual: Vec<f64> = data.targets.iter().map(|&t| from_fixed(t)).collect();
    (rmse(&actual, &predictions), mae(&actual, &predictions))
}

/// Root mean squared error; 0 for empty input
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    (sse / actual.len() as f64).sqrt()
}

/// Mean absolute error; 0 for empty input
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let total: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    total / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmse_and_mae() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.0, 2.0, 3.0, 8.0];
        assert_eq!(rmse(&actual, &predicted), 2.0);
        assert_eq!(mae(&actual, &predicted), 1.0);
        assert_eq!(rmse(&[], &[]), 0.0);
        assert_eq!(mae(&[], &[]), 0.0);
    }
}
