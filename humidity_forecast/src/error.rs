//! Error types for the humidity_forecast crate

use series_math::MathError;
use thiserror::Error;

/// Custom error types for the humidity_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Missing or unreadable source, or required columns absent
    #[error("Data source error: {0}")]
    DataSource(String),

    /// No valid records survived cleaning
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Series shorter than the lookback window
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Caller input rejected before any computation
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Error from invalid configuration parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForecastError {
    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataSource(_) => "data_source",
            ForecastError::EmptyDataset(_) => "empty_dataset",
            ForecastError::InsufficientData(_) => "insufficient_data",
            ForecastError::ContractViolation(_) => "contract_violation",
            ForecastError::InvalidParameter(_) => "invalid_parameter",
            ForecastError::Math(_) => "math",
            ForecastError::Io(_) => "io",
            ForecastError::Serialization(_) => "serialization",
        }
    }

    /// Whether the error stems from the data rather than the caller or the host
    pub fn is_data_validation(&self) -> bool {
        matches!(
            self,
            ForecastError::EmptyDataset(_) | ForecastError::InsufficientData(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            other => ForecastError::Math(other),
        }
    }
}
