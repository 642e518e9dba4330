//! Network layers with hand-written backward passes
//!
//! All tensors are batch-major: a batch of `B` rows flows through the network
//! as `B x features` matrices, one matrix per time step for recurrent layers.

use ndarray::{Array1, Array2, ArrayD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Distribution, StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

/// Activation functions for dense layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Linear => x.clone(),
            Activation::Relu => x.mapv(|v| v.max(0.0)),
            Activation::Tanh => x.mapv(f64::tanh),
            Activation::Sigmoid => x.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        }
    }

    /// Derivative with respect to the pre-activation, given both the
    /// pre-activation and the activated output
    pub fn derivative(&self, pre: &Array2<f64>, out: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Linear => Array2::ones(pre.raw_dim()),
            Activation::Relu => pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Tanh => out.mapv(|v| 1.0 - v * v),
            Activation::Sigmoid => out.mapv(|v| v * (1.0 - v)),
        }
    }
}

/// Glorot/Xavier uniform initialisation for a `fan_in x fan_out` kernel
pub(crate) fn glorot_uniform(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((fan_in, fan_out), |_| dist.sample(rng))
}

/// Random orthogonal `n x n` matrix (Gram-Schmidt on a Gaussian matrix)
pub(crate) fn orthogonal(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let mut matrix = Array2::<f64>::from_shape_fn((n, n), |_| StandardNormal.sample(rng));

    for i in 0..n {
        for j in 0..i {
            let previous = matrix.row(j).to_owned();
            let projection = matrix.row(i).dot(&previous);
            matrix.row_mut(i).scaled_add(-projection, &previous);
        }

        let norm = matrix.row(i).dot(&matrix.row(i)).sqrt();
        if norm > 1e-12 {
            matrix.row_mut(i).mapv_inplace(|v| v / norm);
        }
    }

    matrix
}

/// Inverted-dropout mask: kept entries are scaled by `1 / (1 - rate)`
pub(crate) fn dropout_mask(
    rng: &mut StdRng,
    shape: (usize, usize),
    rate: f64,
) -> Option<Array2<f64>> {
    if rate <= 0.0 {
        return None;
    }

    let keep = 1.0 - rate;
    let bernoulli = Bernoulli::new(keep).ok()?;
    Some(Array2::from_shape_fn(shape, |_| {
        if bernoulli.sample(rng) {
            1.0 / keep
        } else {
            0.0
        }
    }))
}

/// Fully-connected layer
#[derive(Debug, Clone)]
pub struct Dense {
    /// `inputs x outputs`
    pub(crate) weights: Array2<f64>,
    pub(crate) biases: Array1<f64>,
    pub(crate) activation: Activation,
}

/// Values kept from a dense forward pass
#[derive(Debug, Clone)]
pub struct DenseTrace {
    pub input: Array2<f64>,
    pub pre: Array2<f64>,
    pub output: Array2<f64>,
}

/// Gradients of a dense layer
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

impl Dense {
    pub fn new(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        Self {
            weights: glorot_uniform(rng, inputs, outputs),
            biases: Array1::zeros(outputs),
            activation,
        }
    }

    pub fn outputs(&self) -> usize {
        self.biases.len()
    }

    pub fn forward(&self, input: &Array2<f64>) -> DenseTrace {
        let mut pre = input.dot(&self.weights);
        pre += &self.biases;
        let output = self.activation.apply(&pre);

        DenseTrace {
            input: input.clone(),
            pre,
            output,
        }
    }

    /// Returns the parameter gradients and the gradient with respect to the input
    pub fn backward(
        &self,
        trace: &DenseTrace,
        grad_output: &Array2<f64>,
    ) -> (DenseGrads, Array2<f64>) {
        let grad_pre = grad_output * &self.activation.derivative(&trace.pre, &trace.output);

        let grads = DenseGrads {
            weights: trace.input.t().dot(&grad_pre),
            biases: grad_pre.sum_axis(Axis(0)),
        };
        let grad_input = grad_pre.dot(&self.weights.t());

        (grads, grad_input)
    }

    pub(crate) fn collect_parameters<'a>(&'a mut self, out: &mut Vec<ArrayViewMutD<'a, f64>>) {
        out.push(self.weights.view_mut().into_dyn());
        out.push(self.biases.view_mut().into_dyn());
    }
}

impl DenseGrads {
    pub(crate) fn into_parts(self) -> [ArrayD<f64>; 2] {
        [self.weights.into_dyn(), self.biases.into_dyn()]
    }
}

/// Elman recurrent layer: `h_t = tanh(x_t K + h_{t-1} R + b)`
#[derive(Debug, Clone)]
pub struct RecurrentLayer {
    /// `inputs x units`
    pub(crate) kernel: Array2<f64>,
    /// `units x units`
    pub(crate) recurrent: Array2<f64>,
    pub(crate) bias: Array1<f64>,
}

/// Values kept from a recurrent forward pass over one sequence batch
#[derive(Debug, Clone)]
pub struct RecurrentTrace {
    /// Input of each step after dropout
    inputs: Vec<Array2<f64>>,
    /// Previous state of each step after recurrent dropout
    carried: Vec<Array2<f64>>,
    /// Output state of each step
    states: Vec<Array2<f64>>,
    input_mask: Option<Array2<f64>>,
    recurrent_mask: Option<Array2<f64>>,
}

impl RecurrentTrace {
    pub fn states(&self) -> &[Array2<f64>] {
        &self.states
    }

    pub fn last_state(&self) -> &Array2<f64> {
        &self.states[self.states.len() - 1]
    }
}

/// Gradients of a recurrent layer
#[derive(Debug, Clone)]
pub struct RecurrentGrads {
    pub kernel: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

impl RecurrentGrads {
    pub(crate) fn into_parts(self) -> [ArrayD<f64>; 3] {
        [
            self.kernel.into_dyn(),
            self.recurrent.into_dyn(),
            self.bias.into_dyn(),
        ]
    }
}

impl RecurrentLayer {
    pub fn new(inputs: usize, units: usize, rng: &mut StdRng) -> Self {
        Self {
            kernel: glorot_uniform(rng, inputs, units),
            recurrent: orthogonal(rng, units),
            bias: Array1::zeros(units),
        }
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }

    pub fn input_size(&self) -> usize {
        self.kernel.nrows()
    }

    /// Run the layer over a sequence of `B x inputs` step matrices.
    ///
    /// Masks are sampled once per sequence and reused at every step.
    pub fn forward(
        &self,
        sequence: &[Array2<f64>],
        input_mask: Option<Array2<f64>>,
        recurrent_mask: Option<Array2<f64>>,
    ) -> RecurrentTrace {
        let batch = sequence.first().map_or(0, |x| x.nrows());
        let mut state = Array2::zeros((batch, self.units()));

        let mut trace = RecurrentTrace {
            inputs: Vec::with_capacity(sequence.len()),
            carried: Vec::with_capacity(sequence.len()),
            states: Vec::with_capacity(sequence.len()),
            input_mask,
            recurrent_mask,
        };

        for x in sequence {
            let input = match &trace.input_mask {
                Some(mask) => x * mask,
                None => x.clone(),
            };
            let carried = match &trace.recurrent_mask {
                Some(mask) => &state * mask,
                None => state,
            };

            let mut pre = input.dot(&self.kernel) + carried.dot(&self.recurrent);
            pre += &self.bias;
            state = pre.mapv(f64::tanh);

            trace.inputs.push(input);
            trace.carried.push(carried);
            trace.states.push(state.clone());
        }

        trace
    }

    /// Backpropagation through time.
    ///
    /// `upstream[t]` is the loss gradient arriving at the output state of step
    /// `t`. Returns the parameter gradients and the gradient for each input step.
    pub fn backward(
        &self,
        trace: &RecurrentTrace,
        upstream: &[Array2<f64>],
    ) -> (RecurrentGrads, Vec<Array2<f64>>) {
        let steps = trace.states.len();
        let batch = trace.states.first().map_or(0, |s| s.nrows());

        let mut grads = RecurrentGrads {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        };
        let mut grad_inputs = vec![Array2::zeros((batch, self.input_size())); steps];
        let mut grad_next = Array2::<f64>::zeros((batch, self.units()));

        for t in (0..steps).rev() {
            let grad_state = &upstream[t] + &grad_next;
            let grad_pre = grad_state * &trace.states[t].mapv(|h| 1.0 - h * h);

            grads.kernel += &trace.inputs[t].t().dot(&grad_pre);
            grads.recurrent += &trace.carried[t].t().dot(&grad_pre);
            grads.bias += &grad_pre.sum_axis(Axis(0));

            let mut grad_input = grad_pre.dot(&self.kernel.t());
            if let Some(mask) = &trace.input_mask {
                grad_input *= mask;
            }
            grad_inputs[t] = grad_input;

            grad_next = grad_pre.dot(&self.recurrent.t());
            if let Some(mask) = &trace.recurrent_mask {
                grad_next *= mask;
            }
        }

        (grads, grad_inputs)
    }

    pub(crate) fn collect_parameters<'a>(&'a mut self, out: &mut Vec<ArrayViewMutD<'a, f64>>) {
        out.push(self.kernel.view_mut().into_dyn());
        out.push(self.recurrent.view_mut().into_dyn());
        out.push(self.bias.view_mut().into_dyn());
    }
}
