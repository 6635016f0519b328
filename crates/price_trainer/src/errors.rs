use carprice_core::errors::{BundleError, EncodingError};
use carprice_core::forest::ModelError;
use thiserror::Error;

/// Errors returned by the deterministic trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("invalid training parameters: {0}")]
    InvalidParams(String),

    #[error("training error: {0}")]
    Training(#[from] ModelError),

    #[error("feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),
}
