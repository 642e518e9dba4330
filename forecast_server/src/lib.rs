//! # forecast_server
//!
//! REST API around the humidity forecasting pipeline. Every forecast request
//! retrains from scratch on a blocking thread under a wall-clock timeout.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use humidity_forecast::{ForecastError, ForecastPipeline, PipelineConfig};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod error;
pub mod routes;

/// Errors raised while assembling the server
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

/// Server settings read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// CSV used by every request
    pub data_source: PathBuf,
    /// Optional JSON pipeline configuration
    pub pipeline_config: Option<PathBuf>,
    pub max_horizon: usize,
    pub forecast_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            data_source: PathBuf::from("data/humidity.csv"),
            pipeline_config: None,
            max_horizon: 30,
            forecast_timeout: Duration::from_secs(300),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Read `HOST`, `PORT`, `DATA_SOURCE`, `PIPELINE_CONFIG`, `MAX_HORIZON`,
    /// `FORECAST_TIMEOUT_SECS` and `CORS_ORIGINS`
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            data_source: lookup("DATA_SOURCE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_source),
            pipeline_config: lookup("PIPELINE_CONFIG").map(PathBuf::from),
            max_horizon: parse_var(&lookup, "MAX_HORIZON", defaults.max_horizon)?,
            forecast_timeout: Duration::from_secs(parse_var(
                &lookup,
                "FORECAST_TIMEOUT_SECS",
                defaults.forecast_timeout.as_secs(),
            )?),
            cors_origins,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| SettingsError::InvalidValue {
            name: "HOST:PORT",
            value: raw,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<ForecastPipeline>,
}

impl AppState {
    /// Load the pipeline configuration named by the settings, if any
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        let config = match &settings.pipeline_config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        Self::with_config(settings, config).map_err(SettingsError::from)
    }

    pub fn with_config(
        settings: Settings,
        mut config: PipelineConfig,
    ) -> Result<Self, ForecastError> {
        config.max_horizon = Some(settings.max_horizon);
        let pipeline = ForecastPipeline::new(config)?;

        Ok(Self {
            settings: Arc::new(settings),
            pipeline: Arc::new(pipeline),
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = origin.as_str(), "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the router with tracing and CORS middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/forecast", post(routes::forecast))
        .route("/api/history", get(routes::history))
        .route("/api/model-info", get(routes::model_info))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
