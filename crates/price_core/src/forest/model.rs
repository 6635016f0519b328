//! Random-forest regression model with deterministic inference
//!
//! Implements a fixed-point-only tree ensemble with:
//! - Canonical JSON serialization
//! - Blake3 model hashing
//! - Integer-only inference (mean of tree outputs)
//! - Split-gain feature importance

use super::tree::Tree;
use crate::encoding::FeatureSchema;
use crate::fixed::{from_fixed, SCALE};
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),
}

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

/// Tree ensemble whose prediction is the mean of its trees.
///
/// Thresholds and leaf values are fixed-point integers scaled by `scale`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestModel {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale factor
    pub scale: i64,

    /// Width of the feature vectors the trees were grown on
    pub feature_count: usize,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,
}

impl ForestModel {
    pub fn new(trees: Vec<Tree>, feature_count: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            trees,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale != SCALE {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        if self.trees.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Model has no trees".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Deterministic inference on a fixed-point feature vector.
    ///
    /// Returns the integer mean of the tree outputs (fixed-point).
    pub fn score(&self, features: &[i64]) -> i64 {
        if self.trees.is_empty() {
            return 0;
        }

        let sum: i128 = self
            .trees
            .iter()
            .map(|tree| tree.evaluate(features) as i128)
            .sum();

        (sum / self.trees.len() as i128) as i64
    }

    /// Prediction in target units
    pub fn predict(&self, features: &[i64]) -> f64 {
        from_fixed(self.score(features))
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Get number of trees in the model
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Normalized split-gain importance per feature index.
    ///
    /// Each tree's gains are normalized to sum to 1, trees with zero total gain
    /// are skipped, the per-tree vectors are averaged and normalized again.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.feature_count];
        let mut contributing = 0usize;

        for tree in &self.trees {
            let mut per_feature = vec![0.0f64; self.feature_count];
            for node in tree.nodes.iter().filter(|n| !n.is_leaf()) {
                if let Some(slot) = usize::try_from(node.feature_idx)
                    .ok()
                    .and_then(|f| per_feature.get_mut(f))
                {
                    *slot += node.gain as f64;
                }
            }

            let tree_total: f64 = per_feature.iter().sum();
            if tree_total <= 0.0 {
                continue;
            }
            contributing += 1;
            for (acc, gain) in totals.iter_mut().zip(per_feature) {
                *acc += gain / tree_total;
            }
        }

        if contributing == 0 {
            return totals;
        }

        for acc in &mut totals {
            *acc /= contributing as f64;
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for acc in &mut totals {
                *acc /= sum;
            }
        }
        totals
    }
}

/// Feature importance paired with schema names, sorted descending by score.
///
/// Ties keep schema order.
pub fn feature_importance(model: &ForestModel, schema: &FeatureSchema) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = schema
        .features()
        .map(str::to_string)
        .zip(model.feature_importances())
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs
}
