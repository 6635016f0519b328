//! Deterministic random-forest trainer for used-car prices
//!
//! Grows bagged CART regression trees in fixed-point arithmetic so a given
//! seed reproduces the same model on every platform.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod trainer;

use carprice_core::records::RecordSet;
use carprice_core::store::read_csv;
use std::path::Path;

pub use carprice_core::forest::feature_importance;
pub use dataset::Dataset;
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainerError;
pub use metrics::Metrics;
pub use pipeline::{
    sample_requests, train_pipeline, train_pipeline_with, TrainingOptions, TrainingOutcome,
};
pub use trainer::{ForestTrainer, TrainingParams};

/// Train a bundle directly from a listings CSV file.
pub fn train_from_csv(
    path: &Path,
    options: &TrainingOptions,
) -> Result<TrainingOutcome, TrainerError> {
    let raw: RecordSet = read_csv(path).map_err(|err| TrainerError::Dataset(err.to_string()))?;
    train_pipeline(&raw, options)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
