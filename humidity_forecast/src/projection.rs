//! Multi-step forecasting by feeding predictions back as inputs

use crate::error::{ForecastError, Result};
use crate::models::TrainedForecaster;
use series_math::MinMaxScaler;
use std::collections::VecDeque;

/// Forecast `horizon` periods past the end of `seed`.
///
/// `seed` holds normalized values; only its last `model.lookback()` entries
/// are used. Each step predicts one normalized value, emits it denormalized
/// through `scaler`, and slides the normalized prediction into the window.
pub fn project<M>(
    model: &M,
    seed: &[f64],
    horizon: usize,
    scaler: &MinMaxScaler,
) -> Result<Vec<f64>>
where
    M: TrainedForecaster + ?Sized,
{
    let lookback = model.lookback();
    if seed.len() < lookback {
        return Err(ForecastError::ContractViolation(format!(
            "Seed window has {} values but the model needs {}",
            seed.len(),
            lookback
        )));
    }

    let mut window: VecDeque<f64> = seed[seed.len() - lookback..].iter().copied().collect();
    let mut forecast = Vec::new();

    for _ in 0..horizon {
        let next = model.predict(window.make_contiguous())?;
        forecast.push(scaler.inverse(next));

        window.pop_front();
        window.push_back(next);
    }

    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;

    /// Predicts the window mean plus a fixed step and records every query
    #[derive(Debug)]
    struct Recorder {
        lookback: usize,
        step: f64,
        seen: RefCell<Vec<Vec<f64>>>,
    }

    impl TrainedForecaster for Recorder {
        fn lookback(&self) -> usize {
            self.lookback
        }

        fn predict(&self, window: &[f64]) -> Result<f64> {
            self.seen.borrow_mut().push(window.to_vec());
            Ok(window.iter().sum::<f64>() / window.len() as f64 + self.step)
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    fn recorder(lookback: usize, step: f64) -> Recorder {
        Recorder {
            lookback,
            step,
            seen: RefCell::new(Vec::new()),
        }
    }

    fn scaler() -> MinMaxScaler {
        MinMaxScaler::fit(&[50.0, 100.0]).unwrap()
    }

    #[test]
    fn test_feeds_normalized_predictions_back() {
        let model = recorder(2, 0.1);
        let forecast = project(&model, &[0.0, 0.2, 0.4], 3, &scaler()).unwrap();

        let seen = model.seen.borrow();
        assert_eq!(seen[0], vec![0.2, 0.4]);
        // 0.3 + 0.1
        assert_abs_diff_eq!(seen[1][1], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[1][0], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[2][1], 0.5, epsilon = 1e-12);

        assert_eq!(forecast.len(), 3);
        assert_abs_diff_eq!(forecast[0], 70.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[1], 75.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[2], 77.5, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let model = recorder(2, 0.0);
        assert!(project(&model, &[0.1, 0.2], 0, &scaler()).unwrap().is_empty());
        assert!(model.seen.borrow().is_empty());
    }

    #[test]
    fn test_values_may_leave_training_range() {
        let model = recorder(1, 0.5);
        let forecast = project(&model, &[1.0], 2, &scaler()).unwrap();
        assert_abs_diff_eq!(forecast[0], 125.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[1], 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_seed_rejected() {
        let model = recorder(4, 0.0);
        assert!(matches!(
            project(&model, &[0.1, 0.2], 1, &scaler()),
            Err(ForecastError::ContractViolation(_))
        ));
    }
}
