//! End-to-end forecasting pipeline
//!
//! A [`ForecastPipeline`] holds configuration only. Every call to
//! [`ForecastPipeline::fit`] builds a fresh [`PipelineRun`] owning its own
//! series, normalization state and trained model; nothing survives between
//! runs.

use crate::config::PipelineConfig;
use crate::data::{DataLoader, Series};
use crate::error::{ForecastError, Result};
use crate::models::{
    ForecastModel, RecurrentForecaster, TrainedForecaster, TrainedRecurrentForecaster,
    TrainingHistory,
};
use crate::projection::project;
use crate::reducer::{ReductionReport, SeriesReducer};
use crate::utils::future_periods;
use serde::{Deserialize, Serialize};
use series_math::{
    downsample, evaluate, make_windows, split_at_ratio, MinMaxScaler, RegressionMetrics, Window,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// How much the pipeline reports while running
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    /// Adds one line per training epoch
    Detailed,
}

impl FromStr for Verbosity {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "0" => Ok(Verbosity::Silent),
            "normal" | "1" => Ok(Verbosity::Normal),
            "detailed" | "2" => Ok(Verbosity::Detailed),
            other => Err(ForecastError::ContractViolation(format!(
                "Unknown verbosity '{}', expected silent, normal or detailed",
                other
            ))),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Verbosity::Silent => "silent",
            Verbosity::Normal => "normal",
            Verbosity::Detailed => "detailed",
        };
        write!(f, "{}", name)
    }
}

/// One forecasting request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Periods to forecast; negative values are rejected
    pub forecast_horizon: i64,
    pub data_source: PathBuf,
    #[serde(default)]
    pub verbosity: Verbosity,
}

impl ForecastRequest {
    pub fn new<P: Into<PathBuf>>(forecast_horizon: i64, data_source: P) -> Self {
        Self {
            forecast_horizon,
            data_source: data_source.into(),
            verbosity: Verbosity::default(),
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Check the horizon and return it as a count
    pub fn validate(&self, max_horizon: Option<usize>) -> Result<usize> {
        let horizon = usize::try_from(self.forecast_horizon).map_err(|_| {
            ForecastError::ContractViolation(format!(
                "Forecast horizon must not be negative, got {}",
                self.forecast_horizon
            ))
        })?;

        if let Some(max) = max_horizon {
            if horizon > max {
                return Err(ForecastError::ContractViolation(format!(
                    "Forecast horizon {} exceeds the maximum of {}",
                    horizon, max
                )));
            }
        }

        Ok(horizon)
    }

    /// Check the horizon against the `1..=max` range front ends accept
    pub fn validate_bounded(&self, max: usize) -> Result<usize> {
        match usize::try_from(self.forecast_horizon) {
            Ok(horizon) if (1..=max).contains(&horizon) => Ok(horizon),
            _ => Err(ForecastError::ContractViolation(format!(
                "Forecast horizon must be between 1 and {}, got {}",
                max, self.forecast_horizon
            ))),
        }
    }
}

/// Future values and held-out accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Forecast values in original units
    pub future_values: Vec<f64>,
    pub metrics: RegressionMetrics,
}

/// True and predicted values over the held-out windows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub past_dates: Vec<String>,
    pub true_values: Vec<f64>,
    pub predicted_values: Vec<f64>,
}

/// Evenly downsampled copy of the reduced series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
    /// Length before downsampling
    pub original_length: usize,
}

impl HistorySample {
    pub fn from_series(series: &Series, max_points: usize) -> Self {
        let granularity = series.granularity();
        let points = downsample(series.points(), max_points);

        Self {
            dates: points.iter().map(|p| granularity.format(p.period)).collect(),
            values: points.iter().map(|p| p.value).collect(),
            original_length: series.len(),
        }
    }
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    #[serde(flatten)]
    pub result: ForecastResult,
    pub future_dates: Vec<String>,
    pub comparison: Comparison,
    pub history: HistorySample,
    pub training: TrainingHistory,
    pub reduction: ReductionReport,
    pub model: String,
}

/// State owned by one fitted run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    series: Series,
    scaler: MinMaxScaler,
    normalized: Vec<f64>,
    windows: Vec<Window>,
    split: usize,
    model: TrainedRecurrentForecaster,
    training: TrainingHistory,
    reduction: ReductionReport,
}

impl PipelineRun {
    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    pub fn model(&self) -> &TrainedRecurrentForecaster {
        &self.model
    }

    pub fn training(&self) -> &TrainingHistory {
        &self.training
    }

    pub fn reduction(&self) -> &ReductionReport {
        &self.reduction
    }

    pub fn train_windows(&self) -> &[Window] {
        &self.windows[..self.split]
    }

    pub fn test_windows(&self) -> &[Window] {
        &self.windows[self.split..]
    }

    /// Score the model on the held-out windows in original units
    pub fn evaluate(&self) -> Result<(RegressionMetrics, Comparison)> {
        let test = self.test_windows();
        let predicted = self.scaler.inverse_all(&self.model.predict_windows(test)?);

        let points = self.series.points();
        let granularity = self.series.granularity();
        let true_values: Vec<f64> = test.iter().map(|w| points[w.target_index()].value).collect();
        let past_dates = test
            .iter()
            .map(|w| granularity.format(points[w.target_index()].period))
            .collect();

        let metrics = evaluate(&predicted, &true_values)?;
        let comparison = Comparison {
            past_dates,
            true_values,
            predicted_values: predicted,
        };

        Ok((metrics, comparison))
    }

    /// Forecast past the end of the series, in original units
    pub fn project(&self, horizon: usize) -> Result<Vec<f64>> {
        project(&self.model, &self.normalized, horizon, &self.scaler)
    }

    /// Predict the period after a hypothetical `reading` that follows the
    /// last `lookback - 1` observed values, in original units
    pub fn what_if(&self, reading: f64) -> Result<f64> {
        if !(0.0..=100.0).contains(&reading) {
            return Err(ForecastError::ContractViolation(format!(
                "Relative humidity must be between 0 and 100, got {}",
                reading
            )));
        }

        let lookback = self.model.lookback();
        let tail = &self.normalized[self.normalized.len() + 1 - lookback..];
        let mut window = tail.to_vec();
        window.push(self.scaler.transform(reading));

        let next = self.model.predict(&window)?;
        Ok(self.scaler.inverse(next))
    }

    /// Rendered periods matching [`Self::project`]'s output
    pub fn future_dates(&self, horizon: usize) -> Result<Vec<String>> {
        let granularity = self.series.granularity();
        let periods = future_periods(self.series.last_period(), self.series.step(), horizon)?;
        Ok(periods.into_iter().map(|p| granularity.format(p)).collect())
    }
}

/// Configured pipeline: load, reduce, normalize, window, train, evaluate, project
#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load and reduce a source without training
    pub fn load_series<P: AsRef<Path>>(&self, path: P) -> Result<(Series, ReductionReport)> {
        let loaded = DataLoader::new(self.config.data.clone()).from_csv(path)?;
        SeriesReducer::new(self.config.data.granularity, self.config.data.reduction)
            .reduce(&loaded.observations)
    }

    /// Load a downsampled history for display
    pub fn history<P: AsRef<Path>>(&self, path: P) -> Result<(HistorySample, ReductionReport)> {
        let (series, report) = self.load_series(path)?;
        Ok((
            HistorySample::from_series(&series, self.config.history_max_points),
            report,
        ))
    }

    /// Load, prepare and train on a source
    pub fn fit<P: AsRef<Path>>(&self, path: P, verbosity: Verbosity) -> Result<PipelineRun> {
        let (series, reduction) = self.load_series(path)?;
        if verbosity >= Verbosity::Normal {
            info!(
                valid = reduction.valid_observations,
                invalid = reduction.invalid_observations,
                zero_readings_removed = reduction.zero_readings_removed,
                periods = series.len(),
                "Loaded series"
            );
        }

        let values = series.values();
        let scaler = MinMaxScaler::fit(&values)?;
        let normalized = scaler.transform_all(&values);

        let windows = make_windows(&normalized, self.config.model.lookback)?;
        let (train, test) = split_at_ratio(&windows, self.config.training.train_ratio)?;
        if train.is_empty() || test.is_empty() {
            return Err(ForecastError::InsufficientData(format!(
                "{} windows cannot fill both a training and a test partition",
                windows.len()
            )));
        }

        let forecaster =
            RecurrentForecaster::new(self.config.model.clone(), self.config.training.clone())?
                .with_epoch_logging(verbosity >= Verbosity::Detailed);
        if verbosity >= Verbosity::Normal {
            info!(
                model = forecaster.name(),
                train_windows = train.len(),
                test_windows = test.len(),
                "Training"
            );
        }

        let (model, training) = forecaster.train(train, test)?;
        if verbosity >= Verbosity::Normal {
            info!(
                epochs = training.epochs_run,
                stopped_early = training.stopped_early,
                best_val_loss = training.best_val_loss(),
                "Training finished"
            );
        }

        let split = train.len();
        Ok(PipelineRun {
            series,
            scaler,
            normalized,
            windows,
            split,
            model,
            training,
            reduction,
        })
    }

    /// Run the whole pipeline for one request.
    ///
    /// The horizon is checked before the source is touched.
    pub fn run(&self, request: &ForecastRequest) -> Result<ForecastReport> {
        let horizon = request.validate(self.config.max_horizon)?;
        let run = self.fit(&request.data_source, request.verbosity)?;
        self.report(&run, horizon, request.verbosity)
    }

    /// Evaluate and project a fitted run
    pub fn report(
        &self,
        run: &PipelineRun,
        horizon: usize,
        verbosity: Verbosity,
    ) -> Result<ForecastReport> {
        let (metrics, comparison) = run.evaluate()?;
        if verbosity >= Verbosity::Normal {
            info!(
                mse = metrics.mse,
                rmse = metrics.rmse,
                mae = metrics.mae,
                r_squared = metrics.r_squared,
                "Held-out metrics"
            );
        }

        let future_dates = run.future_dates(horizon)?;
        let future_values = run.project(horizon)?;
        let history = HistorySample::from_series(run.series(), self.config.history_max_points);

        Ok(ForecastReport {
            result: ForecastResult {
                future_values,
                metrics,
            },
            future_dates,
            comparison,
            history,
            training: run.training().clone(),
            reduction: *run.reduction(),
            model: run.model().name().to_string(),
        })
    }
}
