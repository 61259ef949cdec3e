use ndarray::ArrayView2;

use crate::{
    arch::{loss::PairwiseLogistic, scorer::Scorer},
    error::{RankErr, Result},
    pairs::PairSet,
};

/// Sufficient-decrease coefficient for the Armijo condition.
const ARMIJO_C1: f32 = 1e-4;
/// Step shrink factor between backtracks.
const BACKTRACK: f32 = 0.5;
/// Bound on backtracks per line search before the step is abandoned.
const MAX_BACKTRACKS: usize = 30;

/// Full-gradient trainer.
///
/// Each epoch takes `iterations` steepest-descent steps over the entire
/// pair set, with a backtracking line search choosing the step length.
/// An accepted step never increases the cost.
pub struct BatchTrainer {
    iterations: usize,
    grad: Vec<f32>,
    trial: Vec<f32>,
}

impl BatchTrainer {
    pub fn new(iterations: usize, num_params: usize) -> Self {
        Self {
            iterations,
            grad: vec![0.; num_params],
            trial: vec![0.; num_params],
        }
    }

    /// Runs one epoch and returns the cost after it.
    pub fn run_epoch(
        &mut self,
        scorer: &Scorer,
        loss: &PairwiseLogistic,
        x: ArrayView2<f32>,
        pairs: &PairSet,
        params: &mut [f32],
        epoch: usize,
    ) -> Result<f32> {
        let scores = scorer.score(params, x)?;
        let mut cost = loss.cost(scores.view(), pairs.as_slice(), params);
        if !cost.is_finite() {
            return Err(RankErr::NonFiniteCost { epoch });
        }

        for _ in 0..self.iterations {
            let acts = scorer.forward(params, x)?;
            let dscore = loss.score_grad(acts.scores.view(), pairs.as_slice());

            self.grad.fill(0.);
            scorer.backward(params, x, &acts, dscore.view(), &mut self.grad)?;
            loss.penalty_grad(params, &mut self.grad);

            let grad_norm2: f32 = self.grad.iter().map(|g| g * g).sum();
            if grad_norm2 == 0. {
                break;
            }

            // Backtrack along the steepest-descent direction until the
            // Armijo condition holds.
            let mut step = 1.;
            let mut taken = false;
            for _ in 0..MAX_BACKTRACKS {
                for ((t, p), g) in self.trial.iter_mut().zip(params.iter()).zip(&self.grad) {
                    *t = p - step * g;
                }

                let trial_scores = scorer.score(&self.trial, x)?;
                let trial_cost = loss.cost(trial_scores.view(), pairs.as_slice(), &self.trial);

                if trial_cost.is_finite() && trial_cost <= cost - ARMIJO_C1 * step * grad_norm2 {
                    params.copy_from_slice(&self.trial);
                    cost = trial_cost;
                    taken = true;
                    break;
                }

                step *= BACKTRACK;
            }

            if !taken {
                // No acceptable step at any scale; the iterate is as good
                // as this search can make it.
                break;
            }
        }

        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::layout::ParameterLayout;
    use ndarray::array;

    #[test]
    fn epochs_never_increase_the_cost() {
        let x = array![[2., 0.], [0., 1.], [1., 1.], [-1., 2.]];
        let pairs = PairSet::from_iter([(0, 1), (0, 3), (2, 1), (2, 3)]);

        let scorer = Scorer::new(ParameterLayout::new(2, 0));
        let loss = PairwiseLogistic::new(0.001);
        let mut params = vec![0.1, -0.1, 0.05];

        let mut trainer = BatchTrainer::new(2, params.len());

        let mut costs = Vec::new();
        for epoch in 0..5 {
            costs.push(
                trainer
                    .run_epoch(&scorer, &loss, x.view(), &pairs, &mut params, epoch)
                    .unwrap(),
            );
        }

        for pair in costs.windows(2) {
            assert!(pair[1] <= pair[0], "cost went up: {costs:?}");
        }
        assert!(costs.last().unwrap() < &costs[0]);
    }

    #[test]
    fn converged_gradient_stops_early() {
        // No pairs and no decay: the gradient is exactly zero.
        let x = array![[1.]];
        let pairs = PairSet::default();

        let scorer = Scorer::new(ParameterLayout::new(1, 0));
        let loss = PairwiseLogistic::new(0.);
        let mut params = vec![0.7, 0.3];
        let before = params.clone();

        let mut trainer = BatchTrainer::new(10, params.len());
        let cost = trainer
            .run_epoch(&scorer, &loss, x.view(), &pairs, &mut params, 0)
            .unwrap();

        assert_eq!(cost, 0.);
        assert_eq!(params, before);
    }
}
