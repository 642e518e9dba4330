//! Adam optimizer

use ndarray::{ArrayD, ArrayViewMutD, Zip};

/// Adam with bias-corrected moment estimates.
///
/// Parameters must be passed in the same order on every call; moment buffers
/// are matched to them by position.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    steps: i32,
    first_moment: Vec<ArrayD<f64>>,
    second_moment: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            steps: 0,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Changes the step size without resetting moment estimates
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn steps(&self) -> i32 {
        self.steps
    }

    pub fn update(&mut self, parameters: Vec<ArrayViewMutD<'_, f64>>, gradients: &[ArrayD<f64>]) {
        debug_assert_eq!(parameters.len(), gradients.len());

        if self.first_moment.len() != gradients.len() {
            self.first_moment = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.second_moment = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.steps = 0;
        }

        self.steps += 1;
        let correction1 = 1.0 - self.beta1.powi(self.steps);
        let correction2 = 1.0 - self.beta2.powi(self.steps);
        let step_size = self.learning_rate * correction2.sqrt() / correction1;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        let moments = self.first_moment.iter_mut().zip(self.second_moment.iter_mut());
        for ((parameter, gradient), (m, v)) in parameters.into_iter().zip(gradients).zip(moments) {
            Zip::from(parameter)
                .and(gradient)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    *p -= step_size * *m / (v.sqrt() + epsilon);
                });
        }
    }
}
