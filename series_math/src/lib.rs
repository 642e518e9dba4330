//! # Series Math
//!
//! Numeric building blocks for univariate forecasting pipelines.
//! This crate provides min-max scaling, sliding-window construction,
//! chronological splitting, regression error metrics and even-index
//! downsampling. Nothing in here performs I/O.

use thiserror::Error;

pub mod metrics;
pub mod sampling;
pub mod scaling;
pub mod windowing;

pub use metrics::{evaluate, RegressionMetrics};
pub use sampling::{downsample, downsample_indices};
pub use scaling::MinMaxScaler;
pub use windowing::{make_windows, split_at_ratio, Window};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
