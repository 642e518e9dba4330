//! Utility functions for the humidity_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDateTime};
use num_traits::Float;

/// Periods following `last`, spaced by `step`.
///
/// Fails with `ContractViolation` when the final period falls outside the
/// representable calendar.
pub fn future_periods(
    last: NaiveDateTime,
    step: Duration,
    horizon: usize,
) -> Result<Vec<NaiveDateTime>> {
    let out_of_range = || {
        ForecastError::ContractViolation(format!(
            "Forecast horizon {} runs past the last representable date",
            horizon
        ))
    };

    i32::try_from(horizon)
        .ok()
        .and_then(|steps| step.checked_mul(steps))
        .and_then(|span| last.checked_add_signed(span))
        .ok_or_else(out_of_range)?;

    let mut periods = Vec::with_capacity(horizon);
    let mut current = last;
    for _ in 0..horizon {
        current = current.checked_add_signed(step).ok_or_else(out_of_range)?;
        periods.push(current);
    }

    Ok(periods)
}

/// `None` for NaN and infinities, so values serialize as JSON `null`
pub fn finite_or_none<T: Float>(value: T) -> Option<T> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Round to a fixed number of decimal places
pub fn round_to<T: Float>(value: T, decimals: i32) -> T {
    let factor = match T::from(10.0) {
        Some(ten) => ten.powi(decimals),
        None => return value,
    };
    (value * factor).round() / factor
}
