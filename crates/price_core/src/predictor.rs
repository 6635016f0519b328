//! Single-record and batch price inference
//!
//! Inference is total over the attribute space: absent categorical attributes
//! take the encoder's first (lexicographically smallest) training value, and
//! values never seen during training fall back to index 0. Only a malformed
//! numeric input or a missing bundle can make a prediction fail.

use crate::bundle::ModelBundle;
use crate::cleaner::{ODOMETER, YEAR};
use crate::encoding::transform_partial;
use crate::errors::{BundleError, EncodingError, PredictError};
use crate::fixed::{code_to_fixed, round_cents, to_fixed};
use crate::forest::feature_importance;
use crate::records::{Record, RecordSet, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Column appended by batch inference
pub const PREDICTED_PRICE: &str = "predicted_price";
/// Mandatory categorical attributes
pub const MANUFACTURER: &str = "manufacturer";
pub const MODEL: &str = "model";

/// Encoded position used for absent and unseen categorical values
const FALLBACK_INDEX: usize = 0;

/// Optional vehicle attributes a request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Fuel,
    Condition,
    Transmission,
    VehicleType,
    Cylinders,
    TitleStatus,
    Drive,
    Size,
    PaintColor,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Fuel,
        Attribute::Condition,
        Attribute::Transmission,
        Attribute::VehicleType,
        Attribute::Cylinders,
        Attribute::TitleStatus,
        Attribute::Drive,
        Attribute::Size,
        Attribute::PaintColor,
    ];

    /// Listing column this attribute is read from
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Fuel => "fuel",
            Attribute::Condition => "condition",
            Attribute::Transmission => "transmission",
            Attribute::VehicleType => "type",
            Attribute::Cylinders => "cylinders",
            Attribute::TitleStatus => "title_status",
            Attribute::Drive => "drive",
            Attribute::Size => "size",
            Attribute::PaintColor => "paint_color",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.column() == column)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Attributes of one vehicle to price.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub manufacturer: String,
    pub model: String,
    pub year: i32,
    pub odometer: f64,
    pub attributes: BTreeMap<Attribute, String>,
}

impl PredictionRequest {
    pub fn new(
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        odometer: f64,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            year,
            odometer,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an optional attribute
    pub fn with(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.attributes.insert(attribute, value.into());
        self
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<&str> {
        self.attributes.get(&attribute).map(String::as_str)
    }

    /// Build a request from a listing row.
    ///
    /// `manufacturer`, `model`, `year` and `odometer` must be present and the
    /// latter two numeric; optional attributes are taken when populated.
    pub fn from_record(record: &Record) -> Result<Self, PredictError> {
        let category = |column: &str| {
            record
                .get(column)
                .and_then(Value::as_category)
                .map(|v| v.into_owned())
        };
        let number = |column: &str| {
            record.get(column).and_then(Value::as_number).ok_or_else(|| {
                PredictError::InvalidRequest(format!("{column} is missing or not numeric"))
            })
        };

        let manufacturer = category(MANUFACTURER)
            .ok_or_else(|| PredictError::InvalidRequest("manufacturer is missing".into()))?;
        let model =
            category(MODEL).ok_or_else(|| PredictError::InvalidRequest("model is missing".into()))?;

        let year = number("year")?;
        if year.fract() != 0.0 || year < i32::MIN as f64 || year > i32::MAX as f64 {
            return Err(PredictError::InvalidRequest(format!(
                "year {year} is not a whole number"
            )));
        }
        let odometer = number("odometer")?;

        let mut request = Self::new(manufacturer, model, year as i32, odometer);
        for attribute in Attribute::ALL {
            if let Some(value) = category(attribute.column()) {
                request.attributes.insert(attribute, value);
            }
        }
        Ok(request)
    }

    /// The request as a listing row keyed by feature name.
    ///
    /// Blank attribute values stay in the row and are treated as absent by
    /// the encoder.
    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(MANUFACTURER.to_string(), Value::text(&self.manufacturer));
        record.insert(MODEL.to_string(), Value::text(&self.model));
        record.insert(YEAR.to_string(), Value::Number(f64::from(self.year)));
        record.insert(ODOMETER.to_string(), Value::Number(self.odometer));
        for (attribute, value) in &self.attributes {
            record.insert(attribute.column().to_string(), Value::text(value));
        }
        record
    }
}

/// Build the fixed-point feature vector for a request, in schema order.
///
/// An absent numerical feature is zero. An absent categorical feature takes
/// the encoder's first class and an unseen value takes index 0, which is the
/// same code.
pub fn feature_vector(
    bundle: &ModelBundle,
    request: &PredictionRequest,
) -> Result<Vec<i64>, PredictError> {
    if !request.odometer.is_finite() {
        return Err(PredictError::InvalidRequest(format!(
            "odometer {} is not a finite number",
            request.odometer
        )));
    }

    let schema = bundle.schema();
    transform_partial(bundle.encoders(), schema, &request.to_record())
        .into_iter()
        .zip(schema.features())
        .map(|(encoded, name)| match encoded {
            Ok(value) => Ok(value),
            Err(EncodingError::MissingFeature(_)) if schema.is_numerical(name) => Ok(to_fixed(0.0)),
            Err(EncodingError::MissingFeature(_)) => Ok(code_to_fixed(FALLBACK_INDEX)),
            Err(EncodingError::UnseenCategory(unseen)) => {
                debug!("{unseen}; using index {FALLBACK_INDEX}");
                Ok(code_to_fixed(FALLBACK_INDEX))
            }
            Err(EncodingError::MissingEncoder(feature)) => Err(BundleError::Inconsistent(
                format!("no encoder for categorical feature {feature}"),
            )
            .into()),
            Err(e) => Err(PredictError::InvalidRequest(e.to_string())),
        })
        .collect()
}

/// Price estimate for one vehicle, rounded to cents.
pub fn predict(bundle: &ModelBundle, request: &PredictionRequest) -> Result<f64, PredictError> {
    let features = feature_vector(bundle, request)?;
    Ok(round_cents(bundle.model().predict(&features)))
}

/// Price every row, appending `predicted_price`.
///
/// A row that cannot be priced gets a null value; the rest of the batch is
/// unaffected.
pub fn predict_batch(bundle: &ModelBundle, records: &RecordSet) -> Result<RecordSet, PredictError> {
    let mut failed = 0usize;
    let values: Vec<Value> = (0..records.len())
        .map(|idx| {
            let outcome = records
                .record(idx)
                .ok_or_else(|| PredictError::InvalidRequest(format!("row {idx} out of range")))
                .and_then(|record| PredictionRequest::from_record(&record))
                .and_then(|request| predict(bundle, &request));
            match outcome {
                Ok(price) => Value::Number(price),
                Err(e) => {
                    warn!("Row {}: prediction failed: {}", idx, e);
                    failed += 1;
                    Value::Null
                }
            }
        })
        .collect();

    let mut output = records.clone();
    output
        .set_column(PREDICTED_PRICE, values)
        .map_err(|e| PredictError::InvalidRequest(e.to_string()))?;

    debug!(
        "Batch inference: {} rows priced, {} failed",
        records.len() - failed,
        failed
    );
    Ok(output)
}

/// Predictor bound to at most one model bundle.
#[derive(Debug, Clone, Default)]
pub struct PricePredictor {
    bundle: Option<Arc<ModelBundle>>,
}

impl PricePredictor {
    /// A predictor with no model bound
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bundle(bundle: ModelBundle) -> Self {
        Self {
            bundle: Some(Arc::new(bundle)),
        }
    }

    /// Load a bundle from disk and bind it, replacing any previous one.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PredictError> {
        let bundle = ModelBundle::load(path)?;
        self.bundle = Some(Arc::new(bundle));
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PredictError> {
        Ok(self.bundle()?.save(path)?)
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn bundle(&self) -> Result<&ModelBundle, PredictError> {
        self.bundle.as_deref().ok_or(PredictError::ModelNotLoaded)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<f64, PredictError> {
        predict(self.bundle()?, request)
    }

    pub fn predict_batch(&self, records: &RecordSet) -> Result<RecordSet, PredictError> {
        predict_batch(self.bundle()?, records)
    }

    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>, PredictError> {
        let bundle = self.bundle()?;
        Ok(feature_importance(bundle.model(), bundle.schema()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{CategoricalEncoder, EncoderSet, FeatureSchema};
    use crate::fixed::SCALE;
    use crate::forest::{ForestModel, Node, Tree};

    /// Features: year, odometer, manufacturer, model, fuel.
    ///
    /// Price = 10k (<= 2012) or 20k, +5k for fuel index >= 1 (gas).
    fn bundle() -> ModelBundle {
        let schema = FeatureSchema::new(
            vec!["year".into(), "odometer".into()],
            vec!["manufacturer".into(), "model".into(), "fuel".into()],
        );
        let encoders = EncoderSet::new(vec![
            CategoricalEncoder::fit("manufacturer", ["ford", "toyota"]),
            CategoricalEncoder::fit("model", ["camry", "focus"]),
            CategoricalEncoder::fit("fuel", ["diesel", "gas"]),
        ]);
        let year_tree = Tree::new(vec![
            Node::internal(0, 0, 2012 * SCALE, 1, 2, 50),
            Node::leaf(1, 10_000 * SCALE),
            Node::leaf(2, 20_000 * SCALE),
        ]);
        let fuel_tree = Tree::new(vec![
            Node::internal(0, 4, SCALE / 2, 1, 2, 10),
            Node::leaf(1, 0),
            Node::leaf(2, 10_000 * SCALE),
        ]);
        let model = ForestModel::new(vec![year_tree, fuel_tree], 5);
        ModelBundle::new(model, encoders, schema).unwrap()
    }

    #[test]
    fn test_predict_known_vehicle() {
        let request = PredictionRequest::new("toyota", "camry", 2015, 75_000.0)
            .with(Attribute::Fuel, "gas");
        // (20k + 10k) / 2
        assert_eq!(predict(&bundle(), &request).unwrap(), 15_000.0);
    }

    #[test]
    fn test_missing_optional_uses_first_class() {
        let bundle = bundle();
        let bare = PredictionRequest::new("toyota", "camry", 2015, 75_000.0);
        let explicit = bare.clone().with(Attribute::Fuel, "diesel");
        assert_eq!(
            predict(&bundle, &bare).unwrap(),
            predict(&bundle, &explicit).unwrap()
        );
        assert_eq!(predict(&bundle, &bare).unwrap(), 10_000.0);
    }

    #[test]
    fn test_unseen_category_falls_back_to_index_zero() {
        let bundle = bundle();
        let unseen = PredictionRequest::new("lada", "niva", 2015, 75_000.0)
            .with(Attribute::Fuel, "hydrogen");
        let first = PredictionRequest::new("ford", "camry", 2015, 75_000.0)
            .with(Attribute::Fuel, "diesel");
        assert_eq!(
            feature_vector(&bundle, &unseen).unwrap(),
            feature_vector(&bundle, &first).unwrap()
        );
        assert!(predict(&bundle, &unseen).unwrap().is_finite());
    }

    #[test]
    fn test_attributes_outside_schema_are_ignored() {
        let bundle = bundle();
        let plain = PredictionRequest::new("toyota", "camry", 2015, 75_000.0);
        let extra = plain
            .clone()
            .with(Attribute::PaintColor, "red")
            .with(Attribute::Drive, "4wd");
        assert_eq!(
            feature_vector(&bundle, &plain).unwrap(),
            feature_vector(&bundle, &extra).unwrap()
        );
    }

    #[test]
    fn test_feature_vector_follows_schema_order() {
        let request = PredictionRequest::new("toyota", "focus", 2010, 1_500.5)
            .with(Attribute::Fuel, "gas");
        assert_eq!(
            feature_vector(&bundle(), &request).unwrap(),
            vec![2010 * SCALE, 1_500_500_000, SCALE, SCALE, SCALE]
        );
    }

    #[test]
    fn test_non_finite_odometer_is_rejected() {
        let request = PredictionRequest::new("toyota", "camry", 2015, f64::NAN);
        assert!(matches!(
            predict(&bundle(), &request),
            Err(PredictError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unbound_predictor() {
        let predictor = PricePredictor::new();
        let request = PredictionRequest::new("toyota", "camry", 2015, 75_000.0);
        assert!(matches!(
            predictor.predict(&request),
            Err(PredictError::ModelNotLoaded)
        ));
        assert!(matches!(
            predictor.feature_importance(),
            Err(PredictError::ModelNotLoaded)
        ));
        assert!(matches!(
            predictor.save("unused.json"),
            Err(PredictError::ModelNotLoaded)
        ));

        let mut records = RecordSet::new(["manufacturer", "model", "year", "odometer"]).unwrap();
        records
            .push(vec![
                Value::text("toyota"),
                Value::text("camry"),
                Value::text("2015"),
                Value::text("75000"),
            ])
            .unwrap();
        assert!(matches!(
            predictor.predict_batch(&records),
            Err(PredictError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_blank_attribute_counts_as_absent() {
        let bundle = bundle();
        let bare = PredictionRequest::new("toyota", "camry", 2015, 75_000.0);
        let blank = bare.clone().with(Attribute::Fuel, "  ");
        assert_eq!(
            feature_vector(&bundle, &blank).unwrap(),
            feature_vector(&bundle, &bare).unwrap()
        );
    }

    #[test]
    fn test_bound_predictor_importance() {
        let predictor = PricePredictor::from_bundle(bundle());
        let ranked = predictor.feature_importance().unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].0, "year");
        assert_eq!(ranked[1].0, "fuel");
    }

    #[test]
    fn test_from_record() {
        let mut record = Record::new();
        record.insert("manufacturer".into(), Value::text("toyota"));
        record.insert("model".into(), Value::text("camry"));
        record.insert("year".into(), Value::text("2015"));
        record.insert("odometer".into(), Value::Number(75_000.0));
        record.insert("type".into(), Value::text("sedan"));
        record.insert("fuel".into(), Value::Null);

        let request = PredictionRequest::from_record(&record).unwrap();
        assert_eq!(request.year, 2015);
        assert_eq!(request.attribute(Attribute::VehicleType), Some("sedan"));
        assert_eq!(request.attribute(Attribute::Fuel), None);

        record.insert("year".into(), Value::text("soon"));
        assert!(PredictionRequest::from_record(&record).is_err());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut records =
            RecordSet::new(["manufacturer", "model", "year", "odometer", "fuel"]).unwrap();
        for (year, fuel) in [("2015", "gas"), ("2010", "gas"), ("abc", "gas"), ("2020", "diesel")] {
            records
                .push(vec![
                    "toyota".into(),
                    "camry".into(),
                    year.into(),
                    "50000".into(),
                    fuel.into(),
                ])
                .unwrap();
        }

        let output = predict_batch(&bundle(), &records).unwrap();
        assert_eq!(output.len(), 4);
        assert_eq!(output.columns().last().unwrap(), PREDICTED_PRICE);
        assert_eq!(output.get(0, PREDICTED_PRICE), Some(&Value::Number(15_000.0)));
        assert_eq!(output.get(1, PREDICTED_PRICE), Some(&Value::Number(10_000.0)));
        assert_eq!(output.get(2, PREDICTED_PRICE), Some(&Value::Null));
        assert_eq!(output.get(3, PREDICTED_PRICE), Some(&Value::Number(10_000.0)));
    }
}
