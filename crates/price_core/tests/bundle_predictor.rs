//! Cleaning, encoding, bundle persistence and inference wired together
//! without the trainer: the model is a hand-built stump.

use anyhow::Result;
use carprice_core::encoding::{fit, transform};
use carprice_core::fixed::SCALE;
use carprice_core::forest::{ForestModel, Node, Tree};
use carprice_core::predictor::{PredictionRequest, PricePredictor, PREDICTED_PRICE};
use carprice_core::store::{read_csv, read_csv_from, write_csv};
use carprice_core::{clean, BundleError, EncodingError, ModelBundle, PredictError, Value};

const LISTINGS: &str = "\
id,price,year,manufacturer,model,odometer,fuel,VIN
1,15000,2015,toyota,camry,75000,gas,X1
2,9000,2008,ford,focus,140000,gas,X2
3,250,2010,ford,focus,90000,gas,X3
4,21000,2019,honda,civic,12000,,X4
5,32000,2020,ford,f-150,30000,diesel,X5
6,7000,2005,honda,civic,190000,gas,X6
";

fn stump_bundle() -> Result<ModelBundle> {
    let cleaned = clean(&read_csv_from(LISTINGS.as_bytes())?);
    let fitted = fit(&cleaned)?;

    // year <= 2012 -> 8k, else 20k
    let tree = Tree::new(vec![
        Node::internal(0, 0, 2012 * SCALE, 1, 2, 1),
        Node::leaf(1, 8_000 * SCALE),
        Node::leaf(2, 20_000 * SCALE),
    ]);
    let model = ForestModel::new(vec![tree], fitted.schema.len());
    Ok(ModelBundle::new(model, fitted.encoders, fitted.schema)?)
}

#[test]
fn test_fit_on_cleaned_listings() -> Result<()> {
    let cleaned = clean(&read_csv_from(LISTINGS.as_bytes())?);
    // row 3 is too cheap, row 4 has no fuel
    assert_eq!(cleaned.len(), 4);

    let fitted = fit(&cleaned)?;
    assert_eq!(fitted.schema.categorical(), ["manufacturer", "model", "fuel"]);
    let models = fitted.encoders.get("model").unwrap();
    assert_eq!(models.classes(), ["camry", "civic", "f-150", "focus"]);
    assert_eq!(fitted.matrix[0], vec![2015 * SCALE, 75_000 * SCALE, 2 * SCALE, 0, SCALE]);
    assert_eq!(fitted.targets[0], 15_000 * SCALE);

    let again = fit(&cleaned)?;
    assert_eq!(again.schema, fitted.schema);
    assert_eq!(again.matrix, fitted.matrix);
    Ok(())
}

#[test]
fn test_transform_reports_unseen_category() -> Result<()> {
    let bundle = stump_bundle()?;
    let mut record = read_csv_from(LISTINGS.as_bytes())?.record(0).unwrap();
    record.insert("manufacturer".into(), Value::text("lada"));

    match transform(bundle.encoders(), bundle.schema(), &record) {
        Err(EncodingError::UnseenCategory(unseen)) => {
            assert_eq!(unseen.feature, "manufacturer");
            assert_eq!(unseen.value, "lada");
        }
        other => panic!("expected unseen category, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_predictor_lifecycle() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("car_price_model.json");

    let mut predictor = PricePredictor::new();
    assert!(matches!(
        predictor.load(&path),
        Err(PredictError::Bundle(BundleError::NotFound(_)))
    ));
    assert!(!predictor.is_loaded());

    PricePredictor::from_bundle(stump_bundle()?).save(&path)?;
    predictor.load(&path)?;
    assert!(predictor.is_loaded());

    let request = PredictionRequest::new("toyota", "camry", 2015, 75_000.0);
    assert_eq!(predictor.predict(&request)?, 20_000.0);
    Ok(())
}

#[test]
fn test_batch_csv_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("predictions_output.csv");
    let predictor = PricePredictor::from_bundle(stump_bundle()?);

    let listings = "\
manufacturer,model,year,odometer
toyota,camry,2015,75000
ford,focus,,90000
honda,civic,2001,abc
";
    let input = read_csv_from(listings.as_bytes())?;
    write_csv(&output, &predictor.predict_batch(&input)?)?;

    let written = read_csv(&output)?;
    assert_eq!(written.columns().last().map(String::as_str), Some(PREDICTED_PRICE));
    assert_eq!(written.get(0, PREDICTED_PRICE), Some(&Value::text("20000")));
    assert_eq!(written.get(1, PREDICTED_PRICE), Some(&Value::Null));
    assert_eq!(written.get(2, PREDICTED_PRICE), Some(&Value::Null));
    Ok(())
}
