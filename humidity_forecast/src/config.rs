//! Pipeline configuration
//!
//! One parameterized pipeline covers every lookback/epoch/layer-size variant.
//! All fields have defaults, so a JSON file only needs the keys it changes.

use crate::data::{Granularity, ReductionPolicy};
use crate::error::{ForecastError, Result};
use crate::models::layers::Activation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How the CSV source is read and reduced
    pub data: DataSourceConfig,
    /// Network architecture
    pub model: ModelConfig,
    /// Optimisation settings
    pub training: TrainingConfig,
    /// Cap on the number of historical points returned for plotting
    pub history_max_points: usize,
    /// Optional upper bound on the forecast horizon
    pub max_horizon: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataSourceConfig::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            history_max_points: 1200,
            max_horizon: None,
        }
    }
}

/// Layout of the tabular source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub delimiter: char,
    pub timestamp_column: String,
    pub value_column: String,
    /// Accept `85,5` style decimals
    pub decimal_comma: bool,
    pub granularity: Granularity,
    pub reduction: ReductionPolicy,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            timestamp_column: "FechaObservacion".to_string(),
            value_column: "ValorObservado".to_string(),
            decimal_comma: false,
            granularity: Granularity::Day,
            reduction: ReductionPolicy::FirstValid,
        }
    }
}

/// Architecture of the recurrent forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of preceding periods fed to the model
    pub lookback: usize,
    /// Units of each stacked recurrent layer, bottom first
    pub hidden_units: Vec<usize>,
    /// Units of the fully-connected layer before the output
    pub dense_units: usize,
    pub dense_activation: Activation,
    /// Dropout on recurrent-layer inputs, training only
    pub dropout: f64,
    /// Dropout on recurrent connections, training only
    pub recurrent_dropout: f64,
    /// Seed for weight initialisation, dropout masks and shuffling
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lookback: 8,
            hidden_units: vec![64, 48],
            dense_units: 24,
            dense_activation: Activation::Tanh,
            dropout: 0.1,
            recurrent_dropout: 0.05,
            seed: 42,
        }
    }
}

/// Optimisation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Leading share of windows used for training
    pub train_ratio: f64,
    /// Shuffle training windows between epochs
    pub shuffle: bool,
    pub early_stopping: Option<EarlyStoppingConfig>,
    pub reduce_lr: Option<ReduceLrConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            batch_size: 8,
            learning_rate: 0.0007,
            train_ratio: 0.8,
            shuffle: true,
            early_stopping: Some(EarlyStoppingConfig::default()),
            reduce_lr: Some(ReduceLrConfig::default()),
        }
    }
}

/// Stop when validation loss stops improving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStoppingConfig {
    pub patience: usize,
    pub min_delta: f64,
    pub restore_best_weights: bool,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            patience: 12,
            min_delta: 0.0,
            restore_best_weights: true,
        }
    }
}

/// Scale the learning rate down when validation loss plateaus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceLrConfig {
    pub factor: f64,
    pub patience: usize,
    pub min_lr: f64,
    pub min_delta: f64,
}

impl Default for ReduceLrConfig {
    fn default() -> Self {
        Self {
            factor: 0.5,
            patience: 6,
            min_lr: 1e-5,
            min_delta: 1e-4,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.training.validate()?;

        if !self.data.delimiter.is_ascii() {
            return Err(ForecastError::InvalidParameter(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.data.delimiter
            )));
        }

        if self.data.timestamp_column.trim().is_empty() || self.data.value_column.trim().is_empty()
        {
            return Err(ForecastError::InvalidParameter(
                "Column names must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(ForecastError::InvalidParameter(
                "Lookback must be at least 1".to_string(),
            ));
        }

        if self.hidden_units.is_empty() || self.hidden_units.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "At least one recurrent layer with a positive unit count is required".to_string(),
            ));
        }

        if self.dense_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Dense layer must have at least one unit".to_string(),
            ));
        }

        for (name, rate) in [
            ("dropout", self.dropout),
            ("recurrent_dropout", self.recurrent_dropout),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in [0, 1), got {}",
                    name, rate
                )));
            }
        }

        Ok(())
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs must be at least 1".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Batch size must be at least 1".to_string(),
            ));
        }

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Train ratio must be strictly between 0 and 1, got {}",
                self.train_ratio
            )));
        }

        if let Some(reduce) = &self.reduce_lr {
            if !(reduce.factor > 0.0 && reduce.factor < 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Learning-rate reduction factor must be in (0, 1), got {}",
                    reduce.factor
                )));
            }
        }

        Ok(())
    }
}
