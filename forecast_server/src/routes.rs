//! API route handlers

use crate::error::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use humidity_forecast::utils::{finite_or_none, round_to};
use humidity_forecast::{
    Comparison, ForecastReport, ForecastRequest, HistorySample, RegressionMetrics, Verbosity,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;
use tracing::info;

fn default_horizon() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct ForecastBody {
    #[serde(default = "default_horizon")]
    pub forecast_horizon: i64,
    #[serde(default)]
    pub verbosity: Verbosity,
}

#[derive(Debug, Serialize)]
pub struct MetricsBody {
    pub mse: Option<f64>,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub r_squared: Option<f64>,
}

impl From<&RegressionMetrics> for MetricsBody {
    fn from(metrics: &RegressionMetrics) -> Self {
        Self {
            mse: finite_or_none(round_to(metrics.mse, 2)),
            rmse: finite_or_none(round_to(metrics.rmse, 2)),
            mae: finite_or_none(round_to(metrics.mae, 2)),
            r_squared: finite_or_none(round_to(metrics.r_squared, 4)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComparisonBody {
    pub past_dates: Vec<String>,
    pub true_values: Vec<Option<f64>>,
    pub predicted_values: Vec<Option<f64>>,
}

impl From<&Comparison> for ComparisonBody {
    fn from(comparison: &Comparison) -> Self {
        Self {
            past_dates: comparison.past_dates.clone(),
            true_values: sanitize(&comparison.true_values),
            predicted_values: sanitize(&comparison.predicted_values),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryBody {
    pub dates: Vec<String>,
    pub values: Vec<Option<f64>>,
    pub original_length: usize,
}

impl From<&HistorySample> for HistoryBody {
    fn from(history: &HistorySample) -> Self {
        Self {
            dates: history.dates.clone(),
            values: sanitize(&history.values),
            original_length: history.original_length,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub forecast_horizon: usize,
    pub future_values: Vec<Option<f64>>,
    pub future_dates: Vec<String>,
    pub metrics: MetricsBody,
    pub comparison: ComparisonBody,
    pub history: HistoryBody,
    pub model: String,
    pub epochs_run: usize,
    pub generated_at: DateTime<Utc>,
}

impl ForecastResponse {
    fn from_report(report: &ForecastReport, horizon: usize) -> Self {
        Self {
            success: true,
            forecast_horizon: horizon,
            future_values: sanitize(&report.result.future_values),
            future_dates: report.future_dates.clone(),
            metrics: MetricsBody::from(&report.result.metrics),
            comparison: ComparisonBody::from(&report.comparison),
            history: HistoryBody::from(&report.history),
            model: report.model.clone(),
            epochs_run: report.training.epochs_run,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub total_records: usize,
    pub valid_records: usize,
    pub zero_readings_removed: usize,
    pub periods: usize,
    pub message: String,
    pub history: HistoryBody,
}

fn sanitize(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|&v| finite_or_none(v)).collect()
}

/// Train on the configured source and forecast `forecast_horizon` periods
pub async fn forecast(
    State(state): State<AppState>,
    Json(body): Json<ForecastBody>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let request = ForecastRequest::new(body.forecast_horizon, state.settings.data_source.clone())
        .with_verbosity(body.verbosity);
    let horizon = request.validate_bounded(state.settings.max_horizon)?;

    info!(horizon, source = %state.settings.data_source.display(), "Forecast requested");

    let pipeline = state.pipeline.clone();
    let job = task::spawn_blocking(move || pipeline.run(&request));

    // On timeout the blocking task runs to completion and its result is dropped
    let timeout = state.settings.forecast_timeout;
    let report = match tokio::time::timeout(timeout, job).await {
        Err(_) => return Err(ApiError::Timeout(timeout.as_secs())),
        Ok(Err(join_error)) => return Err(ApiError::Internal(join_error.to_string())),
        Ok(Ok(result)) => result?,
    };

    Ok(Json(ForecastResponse::from_report(&report, horizon)))
}

/// Load and reduce the configured source without training
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let pipeline = state.pipeline.clone();
    let source = state.settings.data_source.clone();

    let (sample, report) = task::spawn_blocking(move || pipeline.history(&source))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let total_records = report.valid_observations + report.invalid_observations;
    Ok(Json(HistoryResponse {
        success: true,
        total_records,
        valid_records: report.valid_observations,
        zero_readings_removed: report.zero_readings_removed,
        periods: report.periods,
        message: format!("Loaded {} historical records", total_records),
        history: HistoryBody::from(&sample),
    }))
}

/// Active architecture and training settings
pub async fn model_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.pipeline.config();

    Json(json!({
        "success": true,
        "info": {
            "type": "Stacked recurrent network",
            "architecture": config.model,
            "training": {
                "optimizer": "Adam",
                "loss": "MSE",
                "settings": config.training,
            },
            "data": {
                "normalization": "min-max [0, 1]",
                "train_ratio": config.training.train_ratio,
                "lookback": config.model.lookback,
                "granularity": config.data.granularity,
                "reduction": config.data.reduction,
            },
            "max_horizon": state.settings.max_horizon,
        }
    }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "RENNOR API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "RENNOR Backend API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Endpoint not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use humidity_forecast::{ModelConfig, PipelineConfig, TrainingConfig};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn csv(days: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "FechaObservacion;ValorObservado").unwrap();
        for i in 0..days {
            let value = 70.0 + 6.0 * (i as f64 * 0.5).sin();
            writeln!(file, "2023-{:02}-{:02};{:.1}", 1 + i / 28, 1 + i % 28, value).unwrap();
        }
        file
    }

    fn state(file: &NamedTempFile, epochs: usize, timeout: Duration) -> AppState {
        let settings = Settings {
            data_source: file.path().to_path_buf(),
            forecast_timeout: timeout,
            ..Settings::default()
        };
        let config = PipelineConfig {
            model: ModelConfig {
                lookback: 4,
                hidden_units: vec![8, 6],
                dense_units: 4,
                ..ModelConfig::default()
            },
            training: TrainingConfig {
                epochs,
                ..TrainingConfig::default()
            },
            ..PipelineConfig::default()
        };
        AppState::with_config(settings, config).unwrap()
    }

    fn body(forecast_horizon: i64) -> Json<ForecastBody> {
        Json(ForecastBody {
            forecast_horizon,
            verbosity: Verbosity::Silent,
        })
    }

    #[tokio::test]
    async fn test_forecast_success() {
        let file = csv(40);
        let state = state(&file, 3, Duration::from_secs(120));

        let Json(response) = forecast(State(state), body(5)).await.unwrap();

        assert!(response.success);
        assert_eq!(response.forecast_horizon, 5);
        assert_eq!(response.future_values.len(), 5);
        assert_eq!(response.future_dates.len(), 5);
        assert!(response.metrics.mse.is_some());
        assert_eq!(response.comparison.past_dates.len(), 8);
    }

    #[tokio::test]
    async fn test_forecast_rejects_out_of_range_horizon() {
        let file = csv(40);

        for horizon in [0, -3, 31] {
            let state = state(&file, 1, Duration::from_secs(120));
            let err = forecast(State(state), body(horizon)).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.kind(), "contract_violation");
        }
    }

    #[tokio::test]
    async fn test_forecast_missing_source_is_not_found() {
        let file = csv(40);
        let mut state = state(&file, 1, Duration::from_secs(120));
        let mut settings = (*state.settings).clone();
        settings.data_source = "/no/such/file.csv".into();
        state.settings = std::sync::Arc::new(settings);

        let err = forecast(State(state), body(3)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_forecast_timeout() {
        let file = csv(120);
        let state = state(&file, 200, Duration::from_millis(1));

        let err = forecast(State(state), body(3)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_history() {
        let file = csv(40);
        let state = state(&file, 1, Duration::from_secs(120));

        let Json(response) = history(State(state)).await.unwrap();
        assert_eq!(response.total_records, 40);
        assert_eq!(response.periods, 40);
        assert_eq!(response.history.values.len(), 40);
    }

    #[tokio::test]
    async fn test_model_info_reports_config() {
        let file = csv(10);
        let state = state(&file, 1, Duration::from_secs(120));

        let Json(info) = model_info(State(state)).await;
        assert_eq!(info["info"]["architecture"]["hidden_units"], json!([8, 6]));
        assert_eq!(info["info"]["data"]["lookback"], json!(4));
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_metrics_rounded_and_sanitized() {
        let metrics = RegressionMetrics {
            mse: 12.3456,
            rmse: f64::NAN,
            mae: 2.005,
            r_squared: 0.876543,
        };
        let body = MetricsBody::from(&metrics);

        assert_eq!(body.mse, Some(12.35));
        assert_eq!(body.rmse, None);
        assert_eq!(body.r_squared, Some(0.8765));
    }
}
