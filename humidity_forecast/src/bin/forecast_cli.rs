use clap::Parser;
use humidity_forecast::{ForecastPipeline, ForecastRequest, PipelineConfig, Verbosity};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Forecast daily humidity from a CSV of sensor readings
#[derive(Parser, Debug)]
#[command(name = "forecast_cli", version, about)]
struct Args {
    /// Delimited file with timestamp and value columns
    #[arg(short, long)]
    data: PathBuf,

    /// Number of periods to forecast
    #[arg(short = 'n', long, default_value_t = 7, allow_negative_numbers = true)]
    horizon: i64,

    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// silent, normal or detailed
    #[arg(short, long, default_value = "normal")]
    verbosity: Verbosity,

    /// Largest accepted horizon, unless the configuration sets one
    #[arg(long, default_value_t = 30)]
    max_horizon: usize,

    /// Predict the next period after a hypothetical reading (repeatable)
    #[arg(long = "what-if", value_name = "READING")]
    what_if: Vec<f64>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = match args.verbosity {
        Verbosity::Silent => "warn",
        Verbosity::Normal | Verbosity::Detailed => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("humidity_forecast={}", default_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let max_horizon = *config.max_horizon.get_or_insert(args.max_horizon);
    let pipeline = ForecastPipeline::new(config)?;

    let request = ForecastRequest::new(args.horizon, &args.data).with_verbosity(args.verbosity);
    let horizon = request.validate_bounded(max_horizon)?;

    let run = pipeline.fit(&request.data_source, request.verbosity)?;
    let report = pipeline.report(&run, horizon, request.verbosity)?;
    let what_if = args
        .what_if
        .iter()
        .map(|&reading| run.what_if(reading).map(|next| (reading, next)))
        .collect::<Result<Vec<_>, _>>()?;

    if args.json {
        let mut value = serde_json::to_value(&report)?;
        if !what_if.is_empty() {
            value["what_if"] = what_if
                .iter()
                .map(|(reading, next)| serde_json::json!({ "reading": reading, "next": next }))
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let scaler = run.scaler();
    println!("Model: {}", report.model);
    println!(
        "Series: {} periods ({} zero readings removed), range {:.2} to {:.2}",
        report.history.original_length,
        report.reduction.zero_readings_removed,
        scaler.min(),
        scaler.max()
    );
    println!("Epochs run: {}", report.training.epochs_run);
    println!();
    println!("{}", report.result.metrics);
    println!();
    println!("{:<20} {:>10}", "Date", "Forecast");
    for (date, value) in report.future_dates.iter().zip(&report.result.future_values) {
        println!("{:<20} {:>10.2}", date, value);
    }

    if !what_if.is_empty() {
        println!();
        println!("{:<20} {:>10}", "Reading", "Next");
        for (reading, next) in &what_if {
            println!("{:<20.2} {:>10.2}", reading, next);
        }
    }

    Ok(())
}
