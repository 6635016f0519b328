//! Feature schema and categorical encoding
//!
//! `fit` derives the ordered feature schema from a cleaned record set, fits one
//! sorted-domain encoder per categorical column and produces the fixed-point
//! feature matrix. `transform` applies the same encoding to a single record.
//!
//! Value-to-index assignment depends only on the sorted set of distinct values,
//! never on row order, so the encoding is reproducible from the same input.

use crate::cleaner::{ODOMETER, PRICE, YEAR};
use crate::errors::{EncodingError, UnseenCategory};
use crate::fixed::{code_to_fixed, to_fixed};
use crate::records::{Record, RecordSet, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Numerical block of every schema, in order.
pub const NUMERICAL_FEATURES: [&str; 2] = [YEAR, ODOMETER];

/// Ordered feature names: numerical block first, then categorical block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    numerical: Vec<String>,
    categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(numerical: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numerical,
            categorical,
        }
    }

    /// Schema for a cleaned header: `[year, odometer]` plus every other
    /// non-target column in header order.
    pub fn from_columns(columns: &[String]) -> Self {
        let numerical = NUMERICAL_FEATURES.iter().map(|c| c.to_string()).collect();
        let categorical = columns
            .iter()
            .filter(|c| c.as_str() != PRICE && !NUMERICAL_FEATURES.contains(&c.as_str()))
            .cloned()
            .collect();
        Self {
            numerical,
            categorical,
        }
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Feature names in model input order
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.numerical
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numerical.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }

    pub fn is_numerical(&self, name: &str) -> bool {
        self.numerical.iter().any(|c| c == name)
    }
}

/// Bijection from a feature's sorted training values to `0..k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    feature: String,
    classes: Vec<String>,
}

impl CategoricalEncoder {
    /// Fit on the observed values of one column.
    pub fn fit<'a, I>(feature: &str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = values.into_iter().collect();
        Self {
            feature: feature.to_string(),
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Sorted training domain
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Lexicographically first training value (index 0).
    pub fn first_class(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }

    pub fn encode(&self, value: &str) -> Result<usize, UnseenCategory> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| UnseenCategory {
                feature: self.feature.clone(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Sorted, duplicate-free, non-empty.
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// One encoder per categorical feature, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderSet(Vec<CategoricalEncoder>);

impl EncoderSet {
    pub fn new(encoders: Vec<CategoricalEncoder>) -> Self {
        Self(encoders)
    }

    pub fn get(&self, feature: &str) -> Option<&CategoricalEncoder> {
        self.0.iter().find(|e| e.feature == feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoricalEncoder> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of [`fit`].
#[derive(Debug, Clone)]
pub struct FittedFeatures {
    pub schema: FeatureSchema,
    pub encoders: EncoderSet,
    /// Fixed-point feature rows in schema order
    pub matrix: Vec<Vec<i64>>,
    /// Fixed-point prices
    pub targets: Vec<i64>,
}

/// Derive the schema, fit the encoders and encode every row.
pub fn fit(cleaned: &RecordSet) -> Result<FittedFeatures, EncodingError> {
    for required in [PRICE, YEAR, ODOMETER] {
        if !cleaned.has_column(required) {
            return Err(EncodingError::MissingColumn(required.to_string()));
        }
    }
    if cleaned.is_empty() {
        return Err(EncodingError::EmptyDataset);
    }

    let schema = FeatureSchema::from_columns(cleaned.columns());
    let column_of = |name: &str| {
        cleaned
            .column_index(name)
            .ok_or_else(|| EncodingError::MissingColumn(name.to_string()))
    };

    let mut encoders = Vec::with_capacity(schema.categorical().len());
    for feature in schema.categorical() {
        let idx = column_of(feature)?;
        let mut values = Vec::with_capacity(cleaned.len());
        for (row_idx, row) in cleaned.rows().iter().enumerate() {
            let value = row[idx].as_category().ok_or_else(|| EncodingError::MissingValue {
                row: row_idx,
                column: feature.clone(),
            })?;
            values.push(value);
        }
        encoders.push(CategoricalEncoder::fit(
            feature,
            values.iter().map(|v| v.as_ref()),
        ));
    }
    let encoders = EncoderSet::new(encoders);

    let feature_idx: Vec<usize> = schema
        .features()
        .map(column_of)
        .collect::<Result<_, _>>()?;
    let price_idx = column_of(PRICE)?;

    let mut matrix = Vec::with_capacity(cleaned.len());
    let mut targets = Vec::with_capacity(cleaned.len());
    for (row_idx, row) in cleaned.rows().iter().enumerate() {
        let mut features = Vec::with_capacity(schema.len());
        for (name, &idx) in schema.features().zip(&feature_idx) {
            let value = &row[idx];
            if value.is_missing() {
                return Err(EncodingError::MissingValue {
                    row: row_idx,
                    column: name.to_string(),
                });
            }
            features.push(encode_value(&encoders, &schema, name, value)?);
        }
        matrix.push(features);
        targets.push(to_fixed(numeric(PRICE, &row[price_idx])?));
    }

    info!(
        "Prepared {} features ({} categorical) over {} rows",
        schema.len(),
        schema.categorical().len(),
        matrix.len()
    );

    Ok(FittedFeatures {
        schema,
        encoders,
        matrix,
        targets,
    })
}

/// Encode one complete record. Every schema feature must be present and every
/// categorical value must belong to its encoder's domain.
pub fn transform(
    encoders: &EncoderSet,
    schema: &FeatureSchema,
    record: &Record,
) -> Result<Vec<i64>, EncodingError> {
    transform_partial(encoders, schema, record)
        .into_iter()
        .collect()
}

/// Encode each schema feature of a possibly incomplete record independently.
///
/// The result has one entry per feature in schema order. An absent feature is
/// `MissingFeature` and an unknown value is `UnseenCategory`, so callers can
/// apply their own fallback per position.
pub fn transform_partial(
    encoders: &EncoderSet,
    schema: &FeatureSchema,
    record: &Record,
) -> Vec<Result<i64, EncodingError>> {
    schema
        .features()
        .map(|name| {
            let value = record
                .get(name)
                .filter(|v| !v.is_missing())
                .ok_or_else(|| EncodingError::MissingFeature(name.to_string()))?;
            encode_value(encoders, schema, name, value)
        })
        .collect()
}

fn encode_value(
    encoders: &EncoderSet,
    schema: &FeatureSchema,
    name: &str,
    value: &Value,
) -> Result<i64, EncodingError> {
    if schema.is_numerical(name) {
        return Ok(to_fixed(numeric(name, value)?));
    }
    let encoder = encoders
        .get(name)
        .ok_or_else(|| EncodingError::MissingEncoder(name.to_string()))?;
    let category = value
        .as_category()
        .ok_or_else(|| EncodingError::MissingFeature(name.to_string()))?;
    Ok(code_to_fixed(encoder.encode(&category)?))
}

fn numeric(column: &str, value: &Value) -> Result<f64, EncodingError> {
    value.as_number().ok_or_else(|| EncodingError::InvalidNumber {
        column: column.to_string(),
        value: format!("{value:?}"),
    })
}
