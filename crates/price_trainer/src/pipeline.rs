//! End-to-end training: clean, encode, fit and bundle.

use carprice_core::bundle::ModelBundle;
use carprice_core::cleaner::{clean_with_report, CleaningReport};
use carprice_core::encoding;
use carprice_core::predictor::{Attribute, PredictionRequest};
use carprice_core::records::RecordSet;
use tracing::info;

use crate::errors::TrainerError;
use crate::metrics::Metrics;
use crate::trainer::{ForestTrainer, TrainingParams};

/// Run options; hyperparameters are fixed by [`TrainingParams::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
        }
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub metrics: Metrics,
    pub cleaning: CleaningReport,
}

/// Train a bundle from raw listings.
pub fn train_pipeline(
    raw: &RecordSet,
    options: &TrainingOptions,
) -> Result<TrainingOutcome, TrainerError> {
    train_pipeline_with(raw, options, TrainingParams::default())
}

/// [`train_pipeline`] with explicit forest hyperparameters.
pub fn train_pipeline_with(
    raw: &RecordSet,
    options: &TrainingOptions,
    params: TrainingParams,
) -> Result<TrainingOutcome, TrainerError> {
    let (cleaned, cleaning) = clean_with_report(raw);
    let fitted = encoding::fit(&cleaned)?;

    let trainer = ForestTrainer::new(params);
    let (model, metrics) = trainer.train(
        &fitted.matrix,
        &fitted.targets,
        options.test_fraction,
        options.seed,
    )?;

    let bundle = ModelBundle::new(model, fitted.encoders, fitted.schema)?
        .with_training_summary(metrics.train_rows, metrics.to_pairs());
    info!(
        "Bundle ready: {} features, model hash {}",
        bundle.schema().len(),
        bundle.metadata().model_hash
    );

    Ok(TrainingOutcome {
        bundle,
        metrics,
        cleaning,
    })
}

/// Vehicles priced after training as a smoke check of the fresh bundle.
pub fn sample_requests() -> Vec<PredictionRequest> {
    vec![
        PredictionRequest::new("toyota", "camry", 2015, 75_000.0)
            .with(Attribute::Fuel, "gas")
            .with(Attribute::Condition, "good")
            .with(Attribute::Transmission, "automatic")
            .with(Attribute::VehicleType, "sedan"),
        PredictionRequest::new("ford", "f-150", 2018, 50_000.0)
            .with(Attribute::Fuel, "gas")
            .with(Attribute::Condition, "excellent")
            .with(Attribute::Transmission, "automatic")
            .with(Attribute::VehicleType, "pickup"),
        PredictionRequest::new("honda", "civic", 2020, 25_000.0)
            .with(Attribute::Fuel, "gas")
            .with(Attribute::Condition, "like new")
            .with(Attribute::Transmission, "manual")
            .with(Attribute::VehicleType, "sedan"),
    ]
}
