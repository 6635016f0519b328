//! Random-forest trainer
//!
//! Bagged CART regression trees, grown in parallel with rayon. Each tree's
//! bootstrap draw is seeded from `(seed, tree_index)`, so the forest does not
//! depend on thread scheduling.

use carprice_core::forest::{ForestModel, Tree};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cart::{CartBuilder, PresortedFeatures, TreeConfig};
use crate::dataset::Dataset;
use crate::deterministic::{tree_seed, LcgRng};
use crate::errors::TrainerError;
use crate::metrics::Metrics;

/// Forest hyperparameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingParams {
    pub num_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: u64,
    pub min_samples_leaf: u64,
    /// Draw a bootstrap sample per tree; otherwise every tree sees every row once
    pub bootstrap: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl TrainingParams {
    fn validate(&self) -> Result<(), TrainerError> {
        if self.num_trees == 0 {
            return Err(TrainerError::InvalidParams("num_trees must be positive".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::InvalidParams(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidParams(
                "min_samples_leaf must be positive".into(),
            ));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Random-forest trainer
pub struct ForestTrainer {
    params: TrainingParams,
}

impl ForestTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Split, fit on the training partition and evaluate both partitions.
    pub fn train(
        &self,
        features: &[Vec<i64>],
        targets: &[i64],
        test_fraction: f64,
        seed: u64,
    ) -> Result<(ForestModel, Metrics), TrainerError> {
        let dataset = Dataset::new(features.to_vec(), targets.to_vec())?;
        let (train, test) = dataset.split(test_fraction, seed)?;
        info!(
            "Split {} rows into {} train / {} test (seed {})",
            dataset.len(),
            train.len(),
            test.len(),
            seed
        );

        let model = self.fit(&train, seed)?;
        let metrics = Metrics::evaluate(&model, &train, &test);
        info!(
            "Train RMSE: {:.2}, Test RMSE: {:.2}, Test MAE: {:.2}",
            metrics.train_rmse, metrics.test_rmse, metrics.test_mae
        );
        Ok((model, metrics))
    }

    /// Fit a forest on every row of `train`.
    pub fn fit(&self, train: &Dataset, seed: u64) -> Result<ForestModel, TrainerError> {
        self.params.validate()?;
        if train.is_empty() {
            return Err(TrainerError::Dataset("training set is empty".into()));
        }

        let data = PresortedFeatures::new(&train.features, train.feature_count);
        let config = self.params.tree_config();
        let rows = train.len();

        info!(
            "Growing {} trees on {} rows x {} features",
            self.params.num_trees, rows, train.feature_count
        );

        let trees: Vec<Tree> = (0..self.params.num_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let weights = if self.params.bootstrap {
                    bootstrap_weights(rows, tree_seed(seed, tree_idx))
                } else {
                    vec![1; rows]
                };
                let tree = CartBuilder::new(&data, &train.targets, config.clone()).build(&weights);
                debug!(
                    "Tree {}/{}: {} nodes",
                    tree_idx + 1,
                    self.params.num_trees,
                    tree.nodes.len()
                );
                tree
            })
            .collect();

        let model = ForestModel::new(trees, train.feature_count);
        model.validate()?;
        Ok(model)
    }
}

/// Row multiplicities of a bootstrap sample of size `rows`
fn bootstrap_weights(rows: usize, seed: u64) -> Vec<u32> {
    let mut rng = LcgRng::new(seed);
    let mut weights = vec![0u32; rows];
    for _ in 0..rows {
        weights[rng.next_range(rows)] += 1;
    }
    weights
}
