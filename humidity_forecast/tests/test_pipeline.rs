use chrono::{Duration, NaiveDate};
use humidity_forecast::{
    ForecastError, ForecastPipeline, ForecastRequest, ModelConfig, PipelineConfig,
    TrainingConfig, Verbosity,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Daily readings, semicolon separated, no zeros
fn daily_csv(days: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "FechaObservacion;ValorObservado").unwrap();

    let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        let value = 72.0 + 8.0 * (i as f64 * 0.45).sin() + (i % 3) as f64;
        writeln!(file, "{} 07:00:00;{:.1}", date, value).unwrap();
    }
    file
}

fn small_config(lookback: usize) -> PipelineConfig {
    PipelineConfig {
        model: ModelConfig {
            lookback,
            hidden_units: vec![16, 12],
            dense_units: 8,
            ..ModelConfig::default()
        },
        training: TrainingConfig {
            epochs: 15,
            batch_size: 8,
            learning_rate: 0.005,
            ..TrainingConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_end_to_end_forty_days() {
    let file = daily_csv(40);
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    let request = ForecastRequest::new(3, file.path()).with_verbosity(Verbosity::Silent);

    let report = pipeline.run(&request).unwrap();

    assert_eq!(report.result.future_values.len(), 3);
    assert!(report.result.future_values.iter().all(|v| v.is_finite()));
    assert!(report.result.metrics.mse >= 0.0);
    assert!(report.result.metrics.r_squared <= 1.0);
    approx::assert_abs_diff_eq!(
        report.result.metrics.rmse,
        report.result.metrics.mse.sqrt(),
        epsilon = 1e-12
    );

    // 35 windows: 28 train, 7 held out
    assert_eq!(report.comparison.true_values.len(), 7);
    assert_eq!(report.comparison.predicted_values.len(), 7);
    assert_eq!(report.comparison.past_dates.first().unwrap(), "2023-04-03");
    assert_eq!(report.comparison.past_dates.last().unwrap(), "2023-04-09");

    assert_eq!(
        report.future_dates,
        vec!["2023-04-10", "2023-04-11", "2023-04-12"]
    );
    assert_eq!(report.history.original_length, 40);
    assert_eq!(report.history.values.len(), 40);
    assert_eq!(report.reduction.zero_readings_removed, 0);
    assert!(report.training.epochs_run <= 15);
}

#[test]
fn test_comparison_dates_follow_inputs() {
    let file = daily_csv(40);
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    let run = pipeline.fit(file.path(), Verbosity::Silent).unwrap();

    let dates = run.series().periods();
    for window in run.test_windows() {
        let target = dates[window.target_index()];
        assert!(dates[window.start..window.start + window.lookback()]
            .iter()
            .all(|d| *d < target));
    }
    assert!(run.train_windows().last().unwrap().target_index()
        < run.test_windows()[0].target_index());
}

#[test]
fn test_negative_horizon_rejected_before_loading() {
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    // The source does not exist; the horizon check must fire first
    let request = ForecastRequest::new(-1, "/definitely/missing.csv");

    assert!(matches!(
        pipeline.run(&request),
        Err(ForecastError::ContractViolation(_))
    ));
}

#[test]
fn test_horizon_above_configured_maximum() {
    let file = daily_csv(40);
    let mut config = small_config(5);
    config.max_horizon = Some(30);
    let pipeline = ForecastPipeline::new(config).unwrap();

    let request = ForecastRequest::new(31, file.path());
    assert!(matches!(
        pipeline.run(&request),
        Err(ForecastError::ContractViolation(_))
    ));
}

#[test]
fn test_zero_horizon_still_reports_metrics() {
    let file = daily_csv(30);
    let pipeline = ForecastPipeline::new(small_config(4)).unwrap();
    let request = ForecastRequest::new(0, file.path()).with_verbosity(Verbosity::Silent);

    let report = pipeline.run(&request).unwrap();
    assert!(report.result.future_values.is_empty());
    assert!(report.future_dates.is_empty());
    assert!(report.result.metrics.mae >= 0.0);
}

#[test]
fn test_series_shorter_than_lookback() {
    let file = daily_csv(5);
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    let request = ForecastRequest::new(3, file.path());

    assert!(matches!(
        pipeline.run(&request),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_too_few_windows_to_split() {
    // 7 periods, lookback 5: two windows, floor(2 * 0.8) = 1 train, 1 test
    let file = daily_csv(7);
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    assert!(pipeline.fit(file.path(), Verbosity::Silent).is_ok());

    // 6 periods: one window cannot fill both partitions
    let file = daily_csv(6);
    assert!(matches!(
        pipeline.fit(file.path(), Verbosity::Silent),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_missing_source() {
    let pipeline = ForecastPipeline::new(small_config(5)).unwrap();
    let request = ForecastRequest::new(3, "/definitely/missing.csv");

    assert!(matches!(
        pipeline.run(&request),
        Err(ForecastError::DataSource(_))
    ));
}

#[test]
fn test_history_downsampled() {
    let file = daily_csv(40);
    let mut config = small_config(5);
    config.history_max_points = 10;
    let pipeline = ForecastPipeline::new(config).unwrap();

    let (history, report) = pipeline.history(file.path()).unwrap();
    assert_eq!(history.values.len(), 10);
    assert_eq!(history.original_length, 40);
    assert_eq!(history.dates.first().unwrap(), "2023-03-01");
    assert_eq!(history.dates.last().unwrap(), "2023-04-09");
    assert_eq!(report.periods, 40);
}

#[test]
fn test_report_serializes_flat() {
    let file = daily_csv(30);
    let pipeline = ForecastPipeline::new(small_config(4)).unwrap();
    let request = ForecastRequest::new(2, file.path()).with_verbosity(Verbosity::Silent);

    let report = pipeline.run(&request).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["future_values"].is_array());
    assert!(json["metrics"]["r_squared"].is_number());
    assert!(json["comparison"]["past_dates"].is_array());
    assert_eq!(json["training"]["epochs_run"], report.training.epochs_run);
    assert_eq!(report.training.epochs_run, report.training.train_loss.len());
}

#[test]
fn test_horizon_past_calendar_end_is_rejected() {
    let file = daily_csv(30);
    let pipeline = ForecastPipeline::new(small_config(4)).unwrap();
    let run = pipeline.fit(file.path(), Verbosity::Silent).unwrap();

    let result = pipeline.report(&run, usize::MAX, Verbosity::Silent);
    assert!(matches!(result, Err(ForecastError::ContractViolation(_))));
}

#[test]
fn test_what_if_reading() {
    let file = daily_csv(30);
    let pipeline = ForecastPipeline::new(small_config(4)).unwrap();
    let run = pipeline.fit(file.path(), Verbosity::Silent).unwrap();

    let next = run.what_if(75.0).unwrap();
    assert!(next.is_finite());
    assert_eq!(run.what_if(75.0).unwrap(), next);

    for reading in [-1.0, 100.5, f64::NAN] {
        assert!(matches!(run.what_if(reading), Err(ForecastError::ContractViolation(_))));
    }
}
