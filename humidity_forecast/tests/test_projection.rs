use humidity_forecast::error::{ForecastError, Result};
use humidity_forecast::models::TrainedForecaster;
use humidity_forecast::projection::project;
use series_math::MinMaxScaler;

/// Repeats the most recent value
#[derive(Debug)]
struct Persistence {
    lookback: usize,
}

impl TrainedForecaster for Persistence {
    fn lookback(&self) -> usize {
        self.lookback
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        window
            .last()
            .copied()
            .ok_or_else(|| ForecastError::ContractViolation("empty window".to_string()))
    }

    fn name(&self) -> &str {
        "persistence"
    }
}

/// Extends a linear trend by one step
#[derive(Debug)]
struct Drift;

impl TrainedForecaster for Drift {
    fn lookback(&self) -> usize {
        2
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        Ok(2.0 * window[1] - window[0])
    }

    fn name(&self) -> &str {
        "drift"
    }
}

#[test]
fn test_zero_horizon_yields_empty_forecast() {
    let scaler = MinMaxScaler::fit(&[60.0, 90.0]).unwrap();
    let forecast = project(&Persistence { lookback: 3 }, &[0.1, 0.5, 0.9], 0, &scaler).unwrap();
    assert!(forecast.is_empty());
}

#[test]
fn test_persistence_repeats_last_value_in_original_units() {
    let scaler = MinMaxScaler::fit(&[60.0, 90.0]).unwrap();
    let forecast = project(&Persistence { lookback: 3 }, &[0.1, 0.5, 0.9], 4, &scaler).unwrap();

    assert_eq!(forecast.len(), 4);
    for value in forecast {
        approx::assert_abs_diff_eq!(value, 87.0, epsilon = 1e-9);
    }
}

#[test]
fn test_errors_compound_through_the_window() {
    let scaler = MinMaxScaler::fit(&[0.0, 10.0]).unwrap();
    // Normalized 0.1, 0.2 -> trend continues 0.3, 0.4, 0.5
    let forecast = project(&Drift, &[0.0, 0.1, 0.2], 3, &scaler).unwrap();

    approx::assert_abs_diff_eq!(forecast[0], 3.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(forecast[1], 4.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(forecast[2], 5.0, epsilon = 1e-9);
}

#[test]
fn test_works_through_trait_object() {
    let scaler = MinMaxScaler::fit(&[1.0, 2.0]).unwrap();
    let model: Box<dyn TrainedForecaster> = Box::new(Persistence { lookback: 1 });
    let forecast = project(model.as_ref(), &[0.5], 2, &scaler).unwrap();
    assert_eq!(forecast, vec![1.5, 1.5]);
}
