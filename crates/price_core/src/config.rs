//! Configuration for the training and prediction front ends

use crate::bundle::DEFAULT_BUNDLE_PATH;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default destination of batch predictions
pub const DEFAULT_PREDICTIONS_PATH: &str = "predictions_output.csv";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CarPriceConfig {
    /// Training run configuration
    pub training: TrainingConfig,
    /// Artifact locations
    pub paths: PathsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for the split and the forest
    pub seed: u64,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
}

/// Artifact locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub bundle: PathBuf,
    pub predictions: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            bundle: PathBuf::from(DEFAULT_BUNDLE_PATH),
            predictions: PathBuf::from(DEFAULT_PREDICTIONS_PATH),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CarPriceConfig {
    /// Load configuration from a TOML file; absent keys keep their defaults.
    ///
    /// Values are not validated here since environment and command-line
    /// overrides may still replace them; call [`Self::validate`] once every
    /// layer is applied.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `CARPRICE_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CARPRICE_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.training.seed = seed,
                Err(_) => warn!("Ignoring CARPRICE_SEED={val}: not an unsigned integer"),
            }
        }

        if let Some(val) = lookup("CARPRICE_TEST_FRACTION") {
            match val.trim().parse() {
                Ok(fraction) => self.training.test_fraction = fraction,
                Err(_) => warn!("Ignoring CARPRICE_TEST_FRACTION={val}: not a number"),
            }
        }

        if let Some(val) = lookup("CARPRICE_BUNDLE_PATH") {
            self.paths.bundle = PathBuf::from(val);
        }

        if let Some(val) = lookup("CARPRICE_PREDICTIONS_PATH") {
            self.paths.predictions = PathBuf::from(val);
        }

        if let Some(val) = lookup("CARPRICE_LOG_LEVEL") {
            self.logging.level = val.trim().to_ascii_lowercase();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_fraction must be in (0, 1), got {fraction}"
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
