//! Sliding windows over a normalized series
//!
//! Window `i` pairs `values[i..i + lookback]` with the next value
//! `values[i + lookback]`. Windows come out in temporal order and are never
//! sampled or shuffled here.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// One (input, one-step-ahead target) example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// The `lookback` values preceding the target
    pub input: Vec<f64>,
    /// The value immediately after the input
    pub target: f64,
    /// Index of the first input value in the source series
    pub start: usize,
}

impl Window {
    /// Number of input steps
    pub fn lookback(&self) -> usize {
        self.input.len()
    }

    /// Index of the target value in the source series
    pub fn target_index(&self) -> usize {
        self.start + self.input.len()
    }
}

/// Slice `values` into `values.len() - lookback` windows of length `lookback`
pub fn make_windows(values: &[f64], lookback: usize) -> Result<Vec<Window>> {
    if lookback == 0 {
        return Err(MathError::InvalidInput(
            "Lookback must be at least 1".to_string(),
        ));
    }

    if values.len() <= lookback {
        return Err(MathError::InsufficientData(format!(
            "Series of length {} cannot produce windows with lookback {}",
            values.len(),
            lookback
        )));
    }

    let windows = values
        .windows(lookback + 1)
        .enumerate()
        .map(|(start, chunk)| Window {
            input: chunk[..lookback].to_vec(),
            target: chunk[lookback],
            start,
        })
        .collect();

    Ok(windows)
}

/// Split items chronologically into a leading `train_ratio` share and the rest.
///
/// The leading share holds `floor(len * train_ratio)` items.
pub fn split_at_ratio<T>(items: &[T], train_ratio: f64) -> Result<(&[T], &[T])> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Train ratio must be strictly between 0 and 1, got {}",
            train_ratio
        )));
    }

    let train_size = (items.len() as f64 * train_ratio).floor() as usize;
    Ok(items.split_at(train_size))
}
