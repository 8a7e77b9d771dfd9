use super::Optimizer;
use crate::{MlErr, Result};

/// Gradient descent with momentum and learning rate decay.
///
/// The gradient is expected in the descent direction, so every step is added to the
/// parameters: `v = momentum * v + learning_rate * grad` and then `params += v`.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f64,
    lr_decay: f64,
    momentum: f64,
    velocity: Box<[f64]>,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `lr_decay` - The factor the learning rate is multiplied by on each decay.
    /// * `momentum` - The ratio of the previous step carried into the next one.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(len: usize, learning_rate: f64, lr_decay: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            lr_decay,
            momentum,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Multiplies the learning rate by the decay factor.
    pub fn decay_learning_rate(&mut self) {
        self.learning_rate *= self.lr_decay;
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f64], grad: &[f64]) -> Result<()> {
        for (what, got) in [("parameters", params.len()), ("gradient", grad.len())] {
            if got != self.velocity.len() {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: self.velocity.len(),
                });
            }
        }

        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + lr * g;
                *p += *v;
            });

        Ok(())
    }
}
