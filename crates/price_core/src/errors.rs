//! Error types for the pricing core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a [`RecordSet`](crate::records::RecordSet).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A row does not have one value per column
    #[error("row has {found} values but the record set has {expected} columns")]
    WidthMismatch { expected: usize, found: usize },

    /// A column name appears twice in the header
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}

/// A categorical value that was not part of the encoder's fitted domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unseen category {value:?} for feature {feature}")]
pub struct UnseenCategory {
    pub feature: String,
    pub value: String,
}

/// Errors raised while fitting or applying the feature encoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// Nothing to fit on
    #[error("cannot fit feature encoding on an empty dataset")]
    EmptyDataset,

    /// A required column is absent from the record set
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// A cell that must be populated is missing
    #[error("row {row}: missing value for {column}")]
    MissingValue { row: usize, column: String },

    /// A numeric cell could not be coerced
    #[error("invalid numeric value {value:?} for {column}")]
    InvalidNumber { column: String, value: String },

    /// A schema feature is absent from the record being transformed
    #[error("missing feature: {0}")]
    MissingFeature(String),

    /// A categorical schema feature has no fitted encoder
    #[error("no encoder for categorical feature {0}")]
    MissingEncoder(String),

    /// A categorical value outside the fitted domain
    #[error(transparent)]
    UnseenCategory(#[from] UnseenCategory),
}

/// Model bundle persistence and consistency errors.
#[derive(Error, Debug)]
pub enum BundleError {
    /// No bundle exists at the given location
    #[error("model bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The artifact exists but does not hold a complete, consistent bundle
    #[error("corrupt model bundle {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The bundle members disagree with each other
    #[error("inconsistent model bundle: {0}")]
    Inconsistent(String),

    /// Serialization failed before anything was written
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the predictor.
#[derive(Error, Debug)]
pub enum PredictError {
    /// No model bundle is bound to the predictor
    #[error("no trained model is loaded")]
    ModelNotLoaded,

    /// The request cannot be turned into a feature vector
    #[error("invalid prediction request: {0}")]
    InvalidRequest(String),

    /// Loading or saving the bound bundle failed
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// CSV record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV rows do not form a valid record set
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its admissible range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
