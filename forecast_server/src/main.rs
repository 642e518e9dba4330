//! # forecast_server
//!
//! Serves humidity forecasts over HTTP.

use forecast_server::{build_router, AppState, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forecast_server=info,humidity_forecast=info,tower_http=info".into()
            }),
        )
        .init();

    let settings = Settings::from_env()?;
    let addr = settings.socket_addr()?;
    tracing::info!(
        data_source = %settings.data_source.display(),
        max_horizon = settings.max_horizon,
        cors_origins = ?settings.cors_origins,
        "Configuration loaded"
    );

    let app = build_router(AppState::new(settings)?);

    tracing::info!("forecast_server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
