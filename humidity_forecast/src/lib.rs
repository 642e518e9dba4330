//! # Humidity Forecast
//!
//! Forecast a single environmental measurement (relative humidity) several
//! periods ahead from irregularly sampled observations.
//!
//! ## Pipeline
//!
//! - Load timestamped readings from a delimited file, skipping rows that do not parse
//! - Reduce them to one value per period (first valid reading or mean), dropping zeros
//! - Min-max normalize the series and slice it into fixed-length windows
//! - Train a stacked recurrent network on the leading 80% of windows
//! - Score the held-out windows (MSE, RMSE, MAE, R²)
//! - Project forward by feeding each prediction back into the window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use humidity_forecast::{ForecastPipeline, ForecastRequest, PipelineConfig, Verbosity};
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
//! let request = ForecastRequest::new(7, "data/humidity.csv").with_verbosity(Verbosity::Silent);
//!
//! let report = pipeline.run(&request)?;
//! for (date, value) in report.future_dates.iter().zip(&report.result.future_values) {
//!     println!("{}: {:.1}", date, value);
//! }
//! println!("{}", report.result.metrics);
//! # Ok::<(), humidity_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod reducer;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{ModelConfig, PipelineConfig, TrainingConfig};
pub use crate::data::{DataLoader, Granularity, Observation, ReductionPolicy, Series};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastModel, TrainedForecaster, TrainingHistory};
pub use crate::pipeline::{
    Comparison, ForecastPipeline, ForecastReport, ForecastRequest, ForecastResult,
    HistorySample, PipelineRun, Verbosity,
};
pub use crate::projection::project;
pub use crate::reducer::{ReductionReport, SeriesReducer};
pub use series_math::{MinMaxScaler, RegressionMetrics, Window};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
