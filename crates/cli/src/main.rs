//! Car price estimator command line interface
//!
//! Prices single vehicles or whole listing files with a trained model bundle.

use anyhow::{Context, Result};
use carprice_core::config::CarPriceConfig;
use carprice_core::predictor::{Attribute, PredictionRequest, PricePredictor, PREDICTED_PRICE};
use carprice_core::records::Value;
use carprice_core::store::{read_csv, write_csv};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "carprice")]
#[command(about = "Used-car price estimator", long_about = None)]
#[command(version)]
struct Cli {
    /// Model bundle path
    #[arg(long, global = true)]
    bundle: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the price of one vehicle
    Predict(PredictCommand),
    /// Price every listing in a CSV file
    Batch {
        /// Input CSV of listings
        #[arg(short, long)]
        input: PathBuf,
        /// Output CSV (input columns plus predicted_price)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the most important features of the model
    Importance {
        /// Number of features to show
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

#[derive(Args)]
struct PredictCommand {
    #[arg(long)]
    manufacturer: String,
    #[arg(long)]
    model: String,
    #[arg(long)]
    year: i32,
    #[arg(long)]
    odometer: f64,
    #[arg(long)]
    fuel: Option<String>,
    #[arg(long)]
    condition: Option<String>,
    #[arg(long)]
    transmission: Option<String>,
    /// Body type (sedan, pickup, SUV, ...)
    #[arg(long = "type")]
    vehicle_type: Option<String>,
    #[arg(long)]
    cylinders: Option<String>,
    #[arg(long)]
    title_status: Option<String>,
    #[arg(long)]
    drive: Option<String>,
    #[arg(long)]
    size: Option<String>,
    #[arg(long)]
    paint_color: Option<String>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl PredictCommand {
    fn to_request(&self) -> PredictionRequest {
        let optional = [
            (Attribute::Fuel, &self.fuel),
            (Attribute::Condition, &self.condition),
            (Attribute::Transmission, &self.transmission),
            (Attribute::VehicleType, &self.vehicle_type),
            (Attribute::Cylinders, &self.cylinders),
            (Attribute::TitleStatus, &self.title_status),
            (Attribute::Drive, &self.drive),
            (Attribute::Size, &self.size),
            (Attribute::PaintColor, &self.paint_color),
        ];

        optional.into_iter().fold(
            PredictionRequest::new(&self.manufacturer, &self.model, self.year, self.odometer),
            |request, (attribute, value)| match value {
                Some(value) => request.with(attribute, value.as_str()),
                None => request,
            },
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CarPriceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CarPriceConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(bundle) = &cli.bundle {
        config.paths.bundle = bundle.clone();
    }
    config.validate().context("Invalid configuration")?;

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut predictor = PricePredictor::new();
    predictor.load(&config.paths.bundle).with_context(|| {
        format!(
            "Failed to load model bundle {}",
            config.paths.bundle.display()
        )
    })?;

    match cli.command {
        Commands::Predict(cmd) => handle_predict(&predictor, &cmd),
        Commands::Batch { input, output } => {
            let output = output.unwrap_or_else(|| config.paths.predictions.clone());
            handle_batch(&predictor, &input, &output)
        }
        Commands::Importance { top } => handle_importance(&predictor, top),
    }
}

fn handle_predict(predictor: &PricePredictor, cmd: &PredictCommand) -> Result<()> {
    let request = cmd.to_request();
    let price = predictor.predict(&request)?;

    if cmd.json {
        let attributes: serde_json::Map<String, serde_json::Value> = request
            .attributes
            .iter()
            .map(|(attribute, value)| (attribute.column().to_string(), value.clone().into()))
            .collect();
        let json = serde_json::json!({
            "manufacturer": request.manufacturer,
            "model": request.model,
            "year": request.year,
            "odometer": request.odometer,
            "attributes": attributes,
            "predicted_price": price,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!(
            "Estimated price for {} {} {}: ${:.2}",
            request.year, request.manufacturer, request.model, price
        );
    }
    Ok(())
}

fn handle_batch(predictor: &PricePredictor, input: &Path, output: &Path) -> Result<()> {
    let records =
        read_csv(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let priced = predictor.predict_batch(&records)?;

    let failed = (0..priced.len())
        .filter(|&i| matches!(priced.get(i, PREDICTED_PRICE), Some(Value::Null)))
        .count();
    write_csv(output, &priced)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Predictions saved to {}", output.display());
    println!(
        "Priced {} of {} listings ({} failed), written to {}",
        priced.len() - failed,
        priced.len(),
        failed,
        output.display()
    );
    Ok(())
}

fn handle_importance(predictor: &PricePredictor, top: usize) -> Result<()> {
    println!("{:<15} {:>10}", "feature", "importance");
    for (name, score) in predictor.feature_importance()?.into_iter().take(top) {
        println!("{:<15} {:>10.4}", name, score);
    }
    Ok(())
}
