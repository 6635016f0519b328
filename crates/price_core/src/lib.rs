//! Used-car price estimation core
//!
//! Cleans raw listings, encodes them into fixed-point feature vectors and
//! evaluates a tree-ensemble regressor. A trained model travels as a single
//! verified bundle together with the encoders and schema it needs.
//!
//! Modules:
//! - `records`: Untyped tabular listings
//! - `store`: CSV reading and writing of record sets
//! - `cleaner`: Column dropping, completeness and range filtering
//! - `encoding`: Feature schema and per-feature categorical encoders
//! - `forest`: Integer-only random-forest evaluator
//! - `bundle`: Model bundle persistence with hash verification
//! - `predictor`: Single-record and batch inference
//! - `config`: TOML configuration with environment overrides

pub mod bundle;
pub mod cleaner;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod fixed;
pub mod forest;
pub mod predictor;
pub mod records;
pub mod serde_canon;
pub mod store;

pub use bundle::{BundleMetadata, ModelBundle, DEFAULT_BUNDLE_PATH};
pub use cleaner::{clean, clean_with_report, CleaningReport};
pub use config::CarPriceConfig;
pub use encoding::{CategoricalEncoder, EncoderSet, FeatureSchema, FittedFeatures};
pub use errors::{
    BundleError, ConfigError, EncodingError, PredictError, RecordError, StoreError,
    UnseenCategory,
};
pub use forest::{feature_importance, ForestModel, Node, Tree};
pub use predictor::{predict, predict_batch, Attribute, PredictionRequest, PricePredictor};
pub use records::{Record, RecordSet, Value};
pub use store::{read_csv, write_csv};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
