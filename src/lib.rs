//! # RENNOR
//!
//! `rennor` bundles the workspace crates for forecasting relative humidity
//! with a recurrent network.
//!
//! - [`series_math`]: scaling, windowing, error metrics and downsampling
//! - [`humidity_forecast`]: loading, reduction, training and projection
//!
//! ## Example
//!
//! ```
//! use rennor::series_math::MinMaxScaler;
//!
//! let scaler = MinMaxScaler::fit(&[60.0, 80.0, 100.0]).unwrap();
//! assert_eq!(scaler.transform(80.0), 0.5);
//! assert_eq!(scaler.inverse(1.5), 120.0);
//! ```

pub use humidity_forecast;
pub use series_math;

pub use humidity_forecast::{
    ForecastError, ForecastPipeline, ForecastReport, ForecastRequest, PipelineConfig, Verbosity,
};
