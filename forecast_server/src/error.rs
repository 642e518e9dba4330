//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use humidity_forecast::ForecastError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure of a request, rendered as `{success: false, kind, error}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Forecast did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forecast(err) => match err {
                ForecastError::DataSource(_) => StatusCode::NOT_FOUND,
                ForecastError::EmptyDataset(_)
                | ForecastError::InsufficientData(_)
                | ForecastError::ContractViolation(_)
                | ForecastError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Forecast(err) => err.kind(),
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(kind = self.kind(), %message, "Request failed");
        } else {
            warn!(kind = self.kind(), %message, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "kind": self.kind(),
            "error": message,
        }));

        (status, body).into_response()
    }
}
