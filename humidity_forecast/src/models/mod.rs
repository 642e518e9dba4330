//! Forecasting models for normalized windows
//!
//! A [`ForecastModel`] is an untrained specification (architecture and
//! optimisation settings). Training consumes windows and yields a
//! [`TrainedForecaster`], which only answers read-only single-step queries.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use series_math::Window;
use std::fmt::Debug;

pub mod callbacks;
pub mod layers;
pub mod optimizer;
pub mod recurrent;

pub use recurrent::{RecurrentForecaster, TrainedRecurrentForecaster};

/// Per-epoch record of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean training loss of each epoch
    pub train_loss: Vec<f64>,
    /// Validation loss after each epoch
    pub val_loss: Vec<f64>,
    /// Learning rate in effect during each epoch
    pub learning_rates: Vec<f64>,
    /// Epoch (zero-based) with the lowest validation loss
    pub best_epoch: Option<usize>,
    pub epochs_run: usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    /// Lowest validation loss seen
    pub fn best_val_loss(&self) -> Option<f64> {
        self.best_epoch.and_then(|epoch| self.val_loss.get(epoch).copied())
    }
}

/// Trained model answering one-step-ahead queries in normalized space
pub trait TrainedForecaster: Debug {
    /// Number of input values expected per query
    fn lookback(&self) -> usize;

    /// Predict the value following `window`
    fn predict(&self, window: &[f64]) -> Result<f64>;

    /// Predict the target of every window
    fn predict_windows(&self, windows: &[Window]) -> Result<Vec<f64>> {
        windows.iter().map(|w| self.predict(&w.input)).collect()
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on windows
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecaster;

    /// Fit on `train` windows, monitoring loss on `validation` windows
    fn train(
        &self,
        train: &[Window],
        validation: &[Window],
    ) -> Result<(Self::Trained, TrainingHistory)>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
