//! Regression error metrics for held-out forecasts

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Error statistics comparing predictions against true values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Coefficient of determination
    pub r_squared: f64,
}

/// Compute MSE, RMSE, MAE and R² for equally long, non-empty sequences.
///
/// R² is 0 when the true values have zero variance.
pub fn evaluate(predicted: &[f64], actual: &[f64]) -> Result<RegressionMetrics> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(MathError::InvalidInput(format!(
            "Predicted ({}) and actual ({}) values must have the same non-zero length",
            predicted.len(),
            actual.len()
        )));
    }

    let n = actual.len() as f64;

    let errors: Vec<f64> = predicted
        .iter()
        .zip(actual.iter())
        .map(|(&p, &a)| p - a)
        .collect();

    let ss_res = errors.iter().map(|e| e.powi(2)).sum::<f64>();
    let mse = ss_res / n;
    let rmse = mse.sqrt();
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    let mean_actual = actual.iter().mean();
    let ss_tot = actual
        .iter()
        .map(|a| (a - mean_actual).powi(2))
        .sum::<f64>();

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionMetrics {
        mse,
        rmse,
        mae,
        r_squared,
    })
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  R²:    {:.4}", self.r_squared)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

        let metrics = evaluate(&predicted, &actual).unwrap();

        assert_relative_eq!(metrics.mae, 2.4, epsilon = 1e-12);
        assert_relative_eq!(metrics.mse, 6.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.rmse, 6.0_f64.sqrt(), epsilon = 1e-12);
        // ss_res = 30, ss_tot = 1000
        assert_relative_eq!(metrics.r_squared, 0.97, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_prediction() {
        let values = vec![71.0, 74.5, 80.0, 68.25];
        let metrics = evaluate(&values, &values).unwrap();

        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.r_squared, 1.0);
    }

    #[test]
    fn test_constant_truth_gives_zero_r_squared() {
        let actual = vec![80.0, 80.0, 80.0];
        let predicted = vec![79.0, 81.0, 80.5];

        let metrics = evaluate(&predicted, &actual).unwrap();
        assert_eq!(metrics.r_squared, 0.0);
        assert!(metrics.mse > 0.0);
    }

    #[test]
    fn test_r_squared_can_be_negative() {
        let actual = vec![1.0, 2.0, 3.0];
        let predicted = vec![3.0, 2.0, 1.0];

        let metrics = evaluate(&predicted, &actual).unwrap();
        assert!(metrics.r_squared < 0.0);
    }

    #[test]
    fn test_rejects_mismatched_or_empty() {
        assert!(evaluate(&[1.0, 2.0], &[1.0]).is_err());
        assert!(evaluate(&[], &[]).is_err());
    }

    #[test]
    fn test_display() {
        let metrics = evaluate(&[1.0, 2.0], &[1.0, 3.0]).unwrap();
        let text = metrics.to_string();
        assert!(text.contains("RMSE"));
        assert!(text.contains("R²"));
    }
}
