use carprice_core::encoding::{CategoricalEncoder, EncoderSet, FeatureSchema};
use carprice_core::fixed::SCALE;
use carprice_core::forest::{ForestModel, Node, Tree};
use carprice_core::predictor::{predict, Attribute, PredictionRequest};
use carprice_core::ModelBundle;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const TREES: i64 = 100;

fn sample_bundle() -> ModelBundle {
    // Depth-two trees over year and manufacturer, shifted per tree so the
    // ensemble does not collapse to one path.
    let trees = (0..TREES)
        .map(|t| {
            Tree::new(vec![
                Node::internal(0, 0, (2005 + t % 10) * SCALE, 1, 2, 100),
                Node::internal(1, 2, SCALE / 2, 3, 4, 20),
                Node::internal(2, 1, 90_000 * SCALE, 5, 6, 40),
                Node::leaf(3, (6_000 + t) * SCALE),
                Node::leaf(4, (8_000 + t) * SCALE),
                Node::leaf(5, (18_000 + t) * SCALE),
                Node::leaf(6, (12_000 + t) * SCALE),
            ])
        })
        .collect();

    let schema = FeatureSchema::new(
        vec!["year".into(), "odometer".into()],
        vec!["manufacturer".into(), "model".into(), "fuel".into()],
    );
    let encoders = EncoderSet::new(vec![
        CategoricalEncoder::fit("manufacturer", ["ford", "honda", "toyota"]),
        CategoricalEncoder::fit("model", ["camry", "civic", "f-150"]),
        CategoricalEncoder::fit("fuel", ["diesel", "gas"]),
    ]);

    ModelBundle::new(ForestModel::new(trees, 5), encoders, schema)
        .expect("benchmark bundle is consistent")
}

fn bench_single_prediction(c: &mut Criterion) {
    let bundle = sample_bundle();
    let request =
        PredictionRequest::new("toyota", "camry", 2015, 75_000.0).with(Attribute::Fuel, "gas");

    c.bench_function("forest_single_prediction", |b| {
        b.iter(|| {
            let price = predict(black_box(&bundle), black_box(&request));
            black_box(price).ok();
        });
    });
}

criterion_group!(predict_benches, bench_single_prediction);
criterion_main!(predict_benches);
