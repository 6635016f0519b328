//! Model bundle: the trained ensemble, its encoders and its feature schema
//! persisted and loaded as one unit.
//!
//! The artifact is canonical JSON. The model's BLAKE3 hash is stored in the
//! metadata and re-checked on load, so a bundle whose members were edited or
//! truncated is rejected as corrupt rather than half-loaded.

use crate::encoding::{EncoderSet, FeatureSchema, NUMERICAL_FEATURES};
use crate::errors::BundleError;
use crate::fixed::round_cents;
use crate::forest::ForestModel;
use crate::serde_canon::to_canonical_json;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Default bundle file name
pub const DEFAULT_BUNDLE_PATH: &str = "car_price_model.json";

/// Current on-disk format version
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Provenance recorded alongside the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Unix timestamp (seconds)
    pub created_at: u64,
    pub training_rows: usize,
    /// Diagnostic metrics, rounded to cents
    pub metrics: BTreeMap<String, f64>,
    /// BLAKE3 hash of the model's canonical JSON
    pub model_hash: String,
}

/// Immutable (model, encoders, schema) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    model: ForestModel,
    encoders: EncoderSet,
    schema: FeatureSchema,
    metadata: BundleMetadata,
}

#[derive(Serialize)]
struct BundleFileRef<'a> {
    format_version: u32,
    schema: &'a FeatureSchema,
    encoders: &'a EncoderSet,
    model: &'a ForestModel,
    metadata: &'a BundleMetadata,
}

#[derive(Deserialize)]
struct BundleFile {
    format_version: u32,
    schema: FeatureSchema,
    encoders: EncoderSet,
    model: ForestModel,
    metadata: BundleMetadata,
}

impl ModelBundle {
    /// Assemble a bundle, rejecting members that disagree with each other.
    pub fn new(
        model: ForestModel,
        encoders: EncoderSet,
        schema: FeatureSchema,
    ) -> Result<Self, BundleError> {
        check_consistency(&model, &encoders, &schema).map_err(BundleError::Inconsistent)?;
        let model_hash = model
            .hash_hex()
            .map_err(|e| BundleError::Serialization(e.to_string()))?;

        Ok(Self {
            model,
            encoders,
            schema,
            metadata: BundleMetadata {
                created_at: chrono::Utc::now().timestamp().max(0) as u64,
                training_rows: 0,
                metrics: BTreeMap::new(),
                model_hash,
            },
        })
    }

    /// Record the training set size and diagnostic metrics.
    pub fn with_training_summary<I>(mut self, training_rows: usize, metrics: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        self.metadata.training_rows = training_rows;
        self.metadata.metrics = metrics
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| (k, round_cents(v)))
            .collect();
        self
    }

    pub fn model(&self) -> &ForestModel {
        &self.model
    }

    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    /// Atomically write the bundle to `path`.
    ///
    /// The artifact is fully serialized first, written to a temporary file in
    /// the destination directory and renamed over `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BundleError> {
        let path = path.as_ref();
        let json = to_canonical_json(&BundleFileRef {
            format_version: BUNDLE_FORMAT_VERSION,
            schema: &self.schema,
            encoders: &self.encoders,
            model: &self.model,
            metadata: &self.metadata,
        })
        .map_err(|e| BundleError::Serialization(e.to_string()))?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| BundleError::Io(e.error))?;

        info!(
            "Model bundle saved to {} ({} trees, hash {})",
            path.display(),
            self.model.num_trees(),
            self.metadata.model_hash
        );
        Ok(())
    }

    /// Load and verify a bundle.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let corrupt = |reason: String| BundleError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BundleError::NotFound(PathBuf::from(path)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(corrupt(e.to_string()))
            }
            Err(e) => return Err(BundleError::Io(e)),
        };

        let file: BundleFile =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        if file.format_version != BUNDLE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                file.format_version
            )));
        }

        check_consistency(&file.model, &file.encoders, &file.schema).map_err(corrupt)?;

        let hash = file
            .model
            .hash_hex()
            .map_err(|e| corrupt(e.to_string()))?;
        if hash != file.metadata.model_hash {
            return Err(corrupt(format!(
                "model hash mismatch: expected {}, computed {}",
                file.metadata.model_hash, hash
            )));
        }

        info!(
            "Model bundle loaded from {} ({} features, {} trees)",
            path.display(),
            file.schema.len(),
            file.model.num_trees()
        );

        Ok(Self {
            model: file.model,
            encoders: file.encoders,
            schema: file.schema,
            metadata: file.metadata,
        })
    }
}

fn check_consistency(
    model: &ForestModel,
    encoders: &EncoderSet,
    schema: &FeatureSchema,
) -> Result<(), String> {
    if schema.numerical() != NUMERICAL_FEATURES {
        return Err(format!(
            "numerical features must be {:?}, found {:?}",
            NUMERICAL_FEATURES,
            schema.numerical()
        ));
    }

    let mut seen = HashSet::new();
    for name in schema.features() {
        if !seen.insert(name) {
            return Err(format!("feature {name} appears twice in the schema"));
        }
    }

    if encoders.len() != schema.categorical().len() {
        return Err(format!(
            "{} encoders for {} categorical features",
            encoders.len(),
            schema.categorical().len()
        ));
    }
    for (feature, encoder) in schema.categorical().iter().zip(encoders.iter()) {
        if encoder.feature() != feature {
            return Err(format!(
                "encoder for {} found where {} was expected",
                encoder.feature(),
                feature
            ));
        }
        if !encoder.is_well_formed() {
            return Err(format!("encoder for {feature} has an invalid domain"));
        }
    }

    model.validate().map_err(|e| e.to_string())?;
    if model.feature_count != schema.len() {
        return Err(format!(
            "model expects {} features, schema has {}",
            model.feature_count,
            schema.len()
        ));
    }

    Ok(())
}
