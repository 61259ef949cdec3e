use super::Optimizer;
use crate::error::{RankErr, Result};

/// Guards the adaptive denominator while the running average is still
/// near zero.
const DENOM_EPSILON: f32 = 1e-8;

/// Gradient descent with a per-parameter step size driven by an
/// exponential moving average of squared gradients.
///
/// The average is updated as `sq_avg = m · sq_avg + q · g²` and each
/// coordinate steps by `lr · g / (sqrt(sq_avg) + ε)`, so coordinates
/// with consistently large gradients take smaller steps while sparse,
/// rarely-touched coordinates keep moving.
#[derive(Debug)]
pub struct AdaptiveGradientDescent {
    learning_rate: f32,
    q_learning_rate: f32,
    avg_decay: f32,
    sq_avg: Box<[f32]>,
}

impl AdaptiveGradientDescent {
    /// # Arguments
    /// * `len` - The amount of parameters this instance should track.
    /// * `learning_rate` - Base step length before per-coordinate scaling.
    /// * `q_learning_rate` - Update rate of the squared-gradient average.
    /// * `avg_decay` - Memory of the squared-gradient average, in (0, 1).
    pub fn new(len: usize, learning_rate: f32, q_learning_rate: f32, avg_decay: f32) -> Self {
        Self {
            learning_rate,
            q_learning_rate,
            avg_decay,
            sq_avg: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for AdaptiveGradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(RankErr::LengthMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }
        if params.len() != self.sq_avg.len() {
            return Err(RankErr::LengthMismatch {
                what: "params",
                got: params.len(),
                expected: self.sq_avg.len(),
            });
        }

        let Self {
            learning_rate: lr,
            q_learning_rate: q,
            avg_decay: m,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.sq_avg.iter_mut())
            .for_each(|((p, g), sq)| {
                *sq = m * *sq + q * g * g;
                *p -= lr * g / (sq.sqrt() + DENOM_EPSILON);
            });

        Ok(())
    }
}
