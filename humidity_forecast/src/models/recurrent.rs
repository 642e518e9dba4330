//! Stacked recurrent forecaster
//!
//! Architecture: one or more stacked Elman layers (tanh), each feeding its
//! full state sequence to the next; the final state of the top layer goes
//! through a dense layer and a single linear output unit. Trained with Adam on
//! mean squared error, with optional early stopping and plateau learning-rate
//! reduction monitored on the validation windows.

use super::callbacks::{EarlyStopping, PlateauScheduler};
use super::layers::{dropout_mask, Activation, Dense, DenseTrace, RecurrentLayer, RecurrentTrace};
use super::optimizer::Adam;
use super::{ForecastModel, TrainedForecaster, TrainingHistory};
use crate::config::{ModelConfig, TrainingConfig};
use crate::error::{ForecastError, Result};
use ndarray::{s, Array1, Array2, ArrayD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use series_math::Window;
use tracing::{debug, info, warn};

/// Untrained recurrent forecaster: architecture plus optimisation settings
#[derive(Debug, Clone)]
pub struct RecurrentForecaster {
    name: String,
    model: ModelConfig,
    training: TrainingConfig,
    log_epochs: bool,
}

impl RecurrentForecaster {
    pub fn new(model: ModelConfig, training: TrainingConfig) -> Result<Self> {
        model.validate()?;
        training.validate()?;

        let units = model
            .hidden_units
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join("-");
        let name = format!(
            "Stacked RNN ({}, dense {}, lookback {})",
            units, model.dense_units, model.lookback
        );

        Ok(Self {
            name,
            model,
            training,
            log_epochs: false,
        })
    }

    /// Emit one `info!` line per epoch while training
    pub fn with_epoch_logging(mut self, enabled: bool) -> Self {
        self.log_epochs = enabled;
        self
    }

    fn check_windows(&self, windows: &[Window]) -> Result<()> {
        match windows.iter().find(|w| w.lookback() != self.model.lookback) {
            Some(w) => Err(ForecastError::ContractViolation(format!(
                "Window of length {} does not match lookback {}",
                w.lookback(),
                self.model.lookback
            ))),
            None => Ok(()),
        }
    }
}

impl ForecastModel for RecurrentForecaster {
    type Trained = TrainedRecurrentForecaster;

    fn train(
        &self,
        train: &[Window],
        validation: &[Window],
    ) -> Result<(Self::Trained, TrainingHistory)> {
        if train.is_empty() {
            return Err(ForecastError::InsufficientData(
                "No training windows".to_string(),
            ));
        }
        self.check_windows(train)?;
        self.check_windows(validation)?;

        let mut rng = StdRng::seed_from_u64(self.model.seed);
        let mut network = RecurrentNetwork::new(&self.model, &mut rng);
        let mut optimizer = Adam::new(self.training.learning_rate);

        let (train_x, train_y) = stack_windows(train);
        let validation_set = if validation.is_empty() {
            None
        } else {
            Some(stack_windows(validation))
        };

        let mut early_stopping = self.training.early_stopping.as_ref().map(EarlyStopping::new);
        let mut plateau = self.training.reduce_lr.as_ref().map(PlateauScheduler::new);
        let restore_best = self
            .training
            .early_stopping
            .as_ref()
            .map_or(false, |es| es.restore_best_weights);

        let mut history = TrainingHistory::default();
        let mut best_loss = f64::INFINITY;
        let mut best_network: Option<RecurrentNetwork> = None;
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..self.training.epochs {
            if self.training.shuffle {
                order.shuffle(&mut rng);
            }

            let learning_rate = optimizer.learning_rate();
            let mut loss_sum = 0.0;
            for batch in order.chunks(self.training.batch_size) {
                let x = train_x.select(Axis(0), batch);
                let y = train_y.select(Axis(0), batch);

                let (loss, gradients) = network.loss_and_gradients(&x, &y, &mut rng);
                optimizer.update(network.parameters_mut(), &gradients);
                loss_sum += loss * batch.len() as f64;
            }

            let train_loss = loss_sum / train.len() as f64;
            let val_loss = match &validation_set {
                Some((x, y)) => network.loss(x, y),
                None => train_loss,
            };

            history.train_loss.push(train_loss);
            history.val_loss.push(val_loss);
            history.learning_rates.push(learning_rate);
            history.epochs_run += 1;

            if self.log_epochs {
                info!(
                    epoch = epoch + 1,
                    train_loss, val_loss, learning_rate, "Epoch finished"
                );
            }

            if !train_loss.is_finite() || !val_loss.is_finite() {
                warn!(epoch = epoch + 1, "Loss is no longer finite, stopping training");
                history.stopped_early = true;
                break;
            }

            let improved = match early_stopping.as_mut() {
                Some(stopper) => stopper.observe(val_loss),
                None => val_loss < best_loss,
            };
            if improved {
                best_loss = val_loss;
                history.best_epoch = Some(epoch);
                if restore_best {
                    best_network = Some(network.clone());
                }
            }

            if let Some(scheduler) = plateau.as_mut() {
                if let Some(reduced) = scheduler.observe(val_loss, learning_rate) {
                    debug!(epoch = epoch + 1, learning_rate = reduced, "Reducing learning rate");
                    optimizer.set_learning_rate(reduced);
                }
            }

            if early_stopping.as_ref().map_or(false, EarlyStopping::should_stop) {
                debug!(epoch = epoch + 1, "Early stopping");
                history.stopped_early = true;
                break;
            }
        }

        if let Some(best) = best_network {
            network = best;
        }

        let trained = TrainedRecurrentForecaster {
            name: self.name.clone(),
            network,
        };

        Ok((trained, history))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Trained recurrent forecaster; inference runs without dropout
#[derive(Debug, Clone)]
pub struct TrainedRecurrentForecaster {
    name: String,
    network: RecurrentNetwork,
}

impl TrainedRecurrentForecaster {
    fn check_length(&self, length: usize) -> Result<()> {
        if length != self.network.lookback {
            return Err(ForecastError::ContractViolation(format!(
                "Expected a window of {} values, got {}",
                self.network.lookback, length
            )));
        }
        Ok(())
    }
}

impl TrainedForecaster for TrainedRecurrentForecaster {
    fn lookback(&self) -> usize {
        self.network.lookback
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        self.check_length(window.len())?;

        let x = Array2::from_shape_vec((1, window.len()), window.to_vec())
            .map_err(|e| ForecastError::ContractViolation(e.to_string()))?;
        Ok(self.network.predict(&x)[0])
    }

    fn predict_windows(&self, windows: &[Window]) -> Result<Vec<f64>> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }
        for window in windows {
            self.check_length(window.lookback())?;
        }

        let (x, _) = stack_windows(windows);
        Ok(self.network.predict(&x).to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `(B x lookback)` inputs and `B` targets
fn stack_windows(windows: &[Window]) -> (Array2<f64>, Array1<f64>) {
    let lookback = windows.first().map_or(0, Window::lookback);
    let x = Array2::from_shape_fn((windows.len(), lookback), |(i, t)| windows[i].input[t]);
    let y = windows.iter().map(|w| w.target).collect();
    (x, y)
}

#[derive(Debug, Clone)]
struct RecurrentNetwork {
    lookback: usize,
    dropout: f64,
    recurrent_dropout: f64,
    layers: Vec<RecurrentLayer>,
    hidden: Dense,
    output: Dense,
}

struct NetworkTrace {
    recurrent: Vec<RecurrentTrace>,
    hidden: DenseTrace,
    output: DenseTrace,
}

impl RecurrentNetwork {
    fn new(config: &ModelConfig, rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(config.hidden_units.len());
        let mut input_size = 1;
        for &units in &config.hidden_units {
            layers.push(RecurrentLayer::new(input_size, units, rng));
            input_size = units;
        }

        let hidden = Dense::new(input_size, config.dense_units, config.dense_activation, rng);
        let output = Dense::new(config.dense_units, 1, Activation::Linear, rng);

        Self {
            lookback: config.lookback,
            dropout: config.dropout,
            recurrent_dropout: config.recurrent_dropout,
            layers,
            hidden,
            output,
        }
    }

    /// Forward pass; dropout masks are drawn only when `rng` is given
    fn forward(&self, x: &Array2<f64>, mut rng: Option<&mut StdRng>) -> NetworkTrace {
        let batch = x.nrows();
        let mut sequence: Vec<Array2<f64>> = (0..x.ncols())
            .map(|t| x.slice(s![.., t..t + 1]).to_owned())
            .collect();

        let mut recurrent = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (input_mask, recurrent_mask) = match rng.as_deref_mut() {
                Some(rng) => (
                    dropout_mask(rng, (batch, layer.input_size()), self.dropout),
                    dropout_mask(rng, (batch, layer.units()), self.recurrent_dropout),
                ),
                None => (None, None),
            };

            let trace = layer.forward(&sequence, input_mask, recurrent_mask);
            sequence = trace.states().to_vec();
            recurrent.push(trace);
        }

        let last_state = match sequence.last() {
            Some(state) => state.clone(),
            None => Array2::zeros((batch, self.hidden.weights.nrows())),
        };
        let hidden = self.hidden.forward(&last_state);
        let output = self.output.forward(&hidden.output);

        NetworkTrace {
            recurrent,
            hidden,
            output,
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.forward(x, None).output.output.column(0).to_owned()
    }

    /// Mean squared error without dropout
    fn loss(&self, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let diff = self.predict(x) - y;
        diff.mapv(|d| d * d).sum() / y.len() as f64
    }

    /// Training-mode loss and gradients, ordered as in [`Self::parameters_mut`]
    fn loss_and_gradients(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut StdRng,
    ) -> (f64, Vec<ArrayD<f64>>) {
        let trace = self.forward(x, Some(rng));
        let n = y.len() as f64;

        let diff = trace.output.output.column(0).to_owned() - y;
        let loss = diff.mapv(|d| d * d).sum() / n;
        let grad_output = (diff * (2.0 / n)).insert_axis(Axis(1));

        let (output_grads, grad_hidden) = self.output.backward(&trace.output, &grad_output);
        let (hidden_grads, grad_last) = self.hidden.backward(&trace.hidden, &grad_hidden);

        // Only the final state of the top layer reaches the dense head
        let steps = x.ncols();
        let mut upstream: Vec<Array2<f64>> = (0..steps)
            .map(|_| Array2::zeros(grad_last.raw_dim()))
            .collect();
        if let Some(last) = upstream.last_mut() {
            *last = grad_last;
        }

        let mut layer_grads = Vec::with_capacity(self.layers.len());
        for (layer, layer_trace) in self.layers.iter().zip(&trace.recurrent).rev() {
            let (grads, grad_inputs) = layer.backward(layer_trace, &upstream);
            layer_grads.push(grads);
            upstream = grad_inputs;
        }

        let mut gradients = Vec::with_capacity(self.layers.len() * 3 + 4);
        for grads in layer_grads.into_iter().rev() {
            gradients.extend(grads.into_parts());
        }
        gradients.extend(hidden_grads.into_parts());
        gradients.extend(output_grads.into_parts());

        (loss, gradients)
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut parameters = Vec::with_capacity(self.layers.len() * 3 + 4);
        for layer in self.layers.iter_mut() {
            layer.collect_parameters(&mut parameters);
        }
        self.hidden.collect_parameters(&mut parameters);
        self.output.collect_parameters(&mut parameters);
        parameters
    }
}
