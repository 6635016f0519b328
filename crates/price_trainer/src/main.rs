//! Car price trainer CLI
//!
//! Trains a random-forest price model from a listings CSV and writes the
//! model bundle.

use anyhow::{Context, Result};
use carprice_core::config::CarPriceConfig;
use carprice_core::predictor::predict;
use carprice_core::store::read_csv;
use carprice_trainer::{feature_importance, sample_requests, train_pipeline, TrainingOptions};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "carprice-train")]
#[command(author = "CarPrice Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a used-car price model from listings", long_about = None)]
struct Args {
    /// Input CSV of vehicle listings
    #[arg(short, long)]
    input: PathBuf,

    /// Output path of the model bundle
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the train/test split and the forest
    #[arg(long)]
    seed: Option<u64>,

    /// Share of rows held out for evaluation
    #[arg(long)]
    test_fraction: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CarPriceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CarPriceConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(seed) = args.seed {
        config.training.seed = seed;
    }
    if let Some(fraction) = args.test_fraction {
        config.training.test_fraction = fraction;
    }
    if let Some(output) = &args.output {
        config.paths.bundle = output.clone();
    }
    config.validate().context("Invalid configuration")?;

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Car Price Trainer v{}", env!("CARGO_PKG_VERSION"));

    info!("Loading listings from: {}", args.input.display());
    let raw = read_csv(&args.input).context("Failed to load listings")?;
    info!(
        "Loaded {} rows with {} columns",
        raw.len(),
        raw.columns().len()
    );

    let options = TrainingOptions {
        seed: config.training.seed,
        test_fraction: config.training.test_fraction,
    };
    info!("Training configuration:");
    info!("  Seed: {}", options.seed);
    info!("  Test fraction: {}", options.test_fraction);

    let outcome = train_pipeline(&raw, &options).context("Training failed")?;
    let metrics = &outcome.metrics;
    debug!(
        "Cleaning report: {}",
        serde_json::to_string(&outcome.cleaning).context("Failed to encode cleaning report")?
    );

    info!("Training complete!");
    info!("  Train rows: {}", metrics.train_rows);
    info!("  Test rows: {}", metrics.test_rows);
    info!("  Train RMSE: ${:.2}", metrics.train_rmse);
    info!("  Test RMSE: ${:.2}", metrics.test_rmse);
    info!("  Train MAE: ${:.2}", metrics.train_mae);
    info!("  Test MAE: ${:.2}", metrics.test_mae);

    info!("Top 10 most important features:");
    let bundle = &outcome.bundle;
    for (name, score) in feature_importance(bundle.model(), bundle.schema())
        .into_iter()
        .take(10)
    {
        info!("  {:<15} {:.4}", name, score);
    }

    bundle
        .save(&config.paths.bundle)
        .with_context(|| format!("Failed to save bundle to {}", config.paths.bundle.display()))?;

    info!("Sample predictions:");
    for request in sample_requests() {
        match predict(bundle, &request) {
            Ok(price) => info!(
                "  {} {} {}, {} miles: ${:.2}",
                request.year, request.manufacturer, request.model, request.odometer, price
            ),
            Err(e) => warn!("  {} {}: {}", request.manufacturer, request.model, e),
        }
    }

    info!("Model bundle: {}", config.paths.bundle.display());
    Ok(())
}
