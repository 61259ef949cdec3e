use ndarray::{Array1, ArrayView1};

use crate::{pairs::PreferencePair, stats::sigmoid};

/// Clamp bound keeping pair probabilities away from 0 and 1 so the log
/// cost stays finite. NaN survives `clamp`, which lets real instability
/// surface as a `NonFiniteCost` instead of being masked here.
pub const OFFSET_EPSILON: f32 = 1e-6;

/// Pairwise logistic loss with L2 weight decay.
///
/// Every pair targets probability 1 for its winner, so the per-pair
/// cost is `-2 ln p` with `p = sigmoid(score_w - score_l)` clamped into
/// `[OFFSET_EPSILON, 1 - OFFSET_EPSILON]`.
///
/// Pairs must already be validated against the score vector; indexing
/// with an out-of-range pair panics.
#[derive(Debug, Clone, Copy)]
pub struct PairwiseLogistic {
    l2_decay: f32,
}

impl PairwiseLogistic {
    pub fn new(l2_decay: f32) -> Self {
        Self { l2_decay }
    }

    fn probability(&self, scores: ArrayView1<f32>, pair: &PreferencePair) -> f32 {
        sigmoid(scores[pair.winner] - scores[pair.loser])
            .clamp(OFFSET_EPSILON, 1. - OFFSET_EPSILON)
    }

    /// Clamped winner probabilities, one per pair, in pair order.
    pub fn probabilities(
        &self,
        scores: ArrayView1<f32>,
        pairs: &[PreferencePair],
    ) -> Array1<f32> {
        Array1::from_iter(pairs.iter().map(|p| self.probability(scores, p)))
    }

    /// Total cost over the pair set, including the decay penalty.
    pub fn cost(&self, scores: ArrayView1<f32>, pairs: &[PreferencePair], params: &[f32]) -> f32 {
        let data: f32 = pairs
            .iter()
            .map(|p| -2. * self.probability(scores, p).ln())
            .sum();

        data + self.penalty(params)
    }

    /// `l2_decay · Σ params²`.
    pub fn penalty(&self, params: &[f32]) -> f32 {
        self.l2_decay * params.iter().map(|p| p * p).sum::<f32>()
    }

    /// `d cost / d score`, accumulated per item over every pair touching
    /// it: `-2 (1 - p)` to the winner, `+2 (1 - p)` to the loser.
    pub fn score_grad(&self, scores: ArrayView1<f32>, pairs: &[PreferencePair]) -> Array1<f32> {
        let mut grad = Array1::zeros(scores.len());

        for p in pairs {
            let g = -2. * (1. - self.probability(scores, p));
            grad[p.winner] += g;
            grad[p.loser] -= g;
        }

        grad
    }

    /// Adds the decay term's contribution, `2 · l2_decay · params`, to
    /// the parameter gradient.
    pub fn penalty_grad(&self, params: &[f32], grad: &mut [f32]) {
        for (g, p) in grad.iter_mut().zip(params) {
            *g += 2. * self.l2_decay * p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const PAIR: PreferencePair = PreferencePair {
        winner: 0,
        loser: 1,
    };

    #[test]
    fn cost_matches_by_hand() {
        let loss = PairwiseLogistic::new(0.);
        let scores = array![2., 0.];

        // p = sigmoid(2), cost = -2 ln p
        let p = sigmoid(2.);
        let expected = -2. * p.ln();

        assert!((loss.cost(scores.view(), &[PAIR], &[]) - expected).abs() < 1e-6);
    }

    #[test]
    fn decay_adds_to_cost_and_gradient() {
        let loss = PairwiseLogistic::new(0.5);
        let scores = array![0., 0.];
        let params = [2., -1.];

        // Data term: -2 ln 0.5 per pair. Penalty: 0.5 * (4 + 1).
        let expected = -2. * 0.5_f32.ln() + 2.5;
        assert!((loss.cost(scores.view(), &[PAIR], &params) - expected).abs() < 1e-5);

        let mut grad = [0.; 2];
        loss.penalty_grad(&params, &mut grad);
        assert_eq!(grad, [2., -1.]);
    }

    #[test]
    fn probabilities_are_clamped() {
        let loss = PairwiseLogistic::new(0.);
        let scores = array![1000., -1000.];

        let probs = loss.probabilities(scores.view(), &[PAIR]);
        assert_eq!(probs[0], 1. - OFFSET_EPSILON);

        let reversed = PreferencePair {
            winner: 1,
            loser: 0,
        };
        let probs = loss.probabilities(scores.view(), &[reversed]);
        assert_eq!(probs[0], OFFSET_EPSILON);

        // Even a fully separated pair keeps a finite cost.
        assert!(loss.cost(scores.view(), &[PAIR], &[]).is_finite());
    }

    #[test]
    fn score_grad_pushes_winner_up_and_loser_down() {
        let loss = PairwiseLogistic::new(0.);
        let scores = array![2., 0.];

        let grad = loss.score_grad(scores.view(), &[PAIR]);
        let g = -2. * (1. - sigmoid(2.));

        assert!((grad[0] - g).abs() < 1e-6);
        assert!((grad[1] + g).abs() < 1e-6);
    }

    #[test]
    fn self_pair_gradient_cancels() {
        let loss = PairwiseLogistic::new(0.);
        let scores = array![3.];
        let self_pair = PreferencePair {
            winner: 0,
            loser: 0,
        };

        let grad = loss.score_grad(scores.view(), &[self_pair]);
        assert_eq!(grad[0], 0.);
    }
}
