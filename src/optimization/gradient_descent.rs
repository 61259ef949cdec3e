use super::Optimizer;
use crate::error::{RankErr, Result};

/// Plain gradient descent with a fixed global learning rate.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// # Arguments
    /// * `learning_rate` - The length of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(RankErr::LengthMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let lr = self.learning_rate;
        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * g;
        }

        Ok(())
    }
}
