use humidity_forecast::error::ForecastError;
use rstest::rstest;
use series_math::MathError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::Io(_)));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let forecast_error = ForecastError::from(json_error);
    assert!(matches!(forecast_error, ForecastError::Serialization(_)));
}

#[test]
fn test_math_insufficient_data_keeps_its_kind() {
    let err = ForecastError::from(MathError::InsufficientData("3 values, lookback 5".to_string()));
    assert!(matches!(err, ForecastError::InsufficientData(_)));
    assert!(err.is_data_validation());

    let err = ForecastError::from(MathError::InvalidInput("bad".to_string()));
    assert!(matches!(err, ForecastError::Math(_)));
    assert!(!err.is_data_validation());
}

#[rstest]
#[case(ForecastError::DataSource("x".into()), "data_source")]
#[case(ForecastError::EmptyDataset("x".into()), "empty_dataset")]
#[case(ForecastError::InsufficientData("x".into()), "insufficient_data")]
#[case(ForecastError::ContractViolation("x".into()), "contract_violation")]
#[case(ForecastError::InvalidParameter("x".into()), "invalid_parameter")]
fn test_error_kind(#[case] error: ForecastError, #[case] kind: &str) {
    assert_eq!(error.kind(), kind);
}

#[test]
fn test_error_display() {
    let error = ForecastError::ContractViolation("horizon must not be negative".to_string());
    assert_eq!(
        error.to_string(),
        "Contract violation: horizon must not be negative"
    );

    let error = ForecastError::DataSource("No data source found at x.csv".to_string());
    assert!(error.to_string().starts_with("Data source error"));
}
