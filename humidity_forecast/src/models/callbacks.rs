//! Epoch-end monitors for validation loss

use crate::config::{EarlyStoppingConfig, ReduceLrConfig};

/// Tracks validation loss and signals when patience runs out
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: f64,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(config: &EarlyStoppingConfig) -> Self {
        Self {
            patience: config.patience,
            min_delta: config.min_delta,
            best: f64::INFINITY,
            wait: 0,
        }
    }

    /// Record an epoch's loss; returns true when it is a new best
    pub fn observe(&mut self, loss: f64) -> bool {
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.wait = 0;
            true
        } else {
            self.wait += 1;
            false
        }
    }

    /// True once `patience` epochs in a row failed to improve; never right
    /// after an improving epoch
    pub fn should_stop(&self) -> bool {
        self.wait > 0 && self.wait >= self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Multiplies the learning rate by a factor after a plateau
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    factor: f64,
    patience: usize,
    min_lr: f64,
    min_delta: f64,
    best: f64,
    wait: usize,
}

impl PlateauScheduler {
    pub fn new(config: &ReduceLrConfig) -> Self {
        Self {
            factor: config.factor,
            patience: config.patience,
            min_lr: config.min_lr,
            min_delta: config.min_delta,
            best: f64::INFINITY,
            wait: 0,
        }
    }

    /// Record an epoch's loss; returns the new learning rate when it changes
    pub fn observe(&mut self, loss: f64, current_lr: f64) -> Option<f64> {
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.wait = 0;
            return None;
        }

        self.wait += 1;
        if self.wait < self.patience || current_lr <= self.min_lr {
            return None;
        }

        self.wait = 0;
        Some((current_lr * self.factor).max(self.min_lr))
    }
}
