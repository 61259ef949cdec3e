use ndarray::{ArrayView2, Axis};
use rand::Rng;

use crate::{
    arch::{loss::PairwiseLogistic, scorer::Scorer},
    error::{RankErr, Result},
    optimization::Optimizer,
    pairs::{PairSet, PreferencePair},
};

/// Chunked online trainer.
///
/// Each epoch shuffles the pair set, walks it in outer chunks of
/// `online_chunk_size`, and within each outer chunk evaluates the
/// gradient over inner chunks of `gradient_chunk_size`, applying the
/// optimizer update immediately after every evaluation. Chunking bounds
/// the peak working set of the pair-gradient computation, not
/// concurrency: everything here is single-threaded.
pub struct OnlineTrainer<O: Optimizer> {
    optimizer: O,
    gradient_chunk_size: usize,
    online_chunk_size: usize,
    grad: Vec<f32>,
}

impl<O: Optimizer> OnlineTrainer<O> {
    pub fn new(
        optimizer: O,
        gradient_chunk_size: usize,
        online_chunk_size: usize,
        num_params: usize,
    ) -> Self {
        Self {
            optimizer,
            gradient_chunk_size,
            online_chunk_size,
            grad: vec![0.; num_params],
        }
    }

    /// Runs one epoch over `pairs` and returns the full-set cost after it.
    pub fn run_epoch<R: Rng>(
        &mut self,
        scorer: &Scorer,
        loss: &PairwiseLogistic,
        x: ArrayView2<f32>,
        pairs: &mut PairSet,
        params: &mut [f32],
        epoch: usize,
        rng: &mut R,
    ) -> Result<f32> {
        pairs.shuffle(rng);

        for outer in pairs.as_slice().chunks(self.online_chunk_size) {
            for chunk in outer.chunks(self.gradient_chunk_size) {
                self.step(scorer, loss, x, chunk, params)?;
            }
        }

        let scores = scorer.score(params, x)?;
        let cost = loss.cost(scores.view(), pairs.as_slice(), params);
        if !cost.is_finite() {
            return Err(RankErr::NonFiniteCost { epoch });
        }

        Ok(cost)
    }

    /// One gradient evaluation and optimizer update over `chunk`.
    fn step(
        &mut self,
        scorer: &Scorer,
        loss: &PairwiseLogistic,
        x: ArrayView2<f32>,
        chunk: &[PreferencePair],
        params: &mut [f32],
    ) -> Result<()> {
        // Gather the rows the chunk touches, winners first, so pair i
        // becomes (i, chunk.len() + i) in the compact sub-problem.
        let mut rows = Vec::with_capacity(chunk.len() * 2);
        rows.extend(chunk.iter().map(|p| p.winner));
        rows.extend(chunk.iter().map(|p| p.loser));

        let xc = x.select(Axis(0), &rows);
        let local: Vec<PreferencePair> = (0..chunk.len())
            .map(|i| PreferencePair {
                winner: i,
                loser: chunk.len() + i,
            })
            .collect();

        let acts = scorer.forward(params, xc.view())?;
        let dscore = loss.score_grad(acts.scores.view(), &local);

        self.grad.fill(0.);
        scorer.backward(params, xc.view(), &acts, dscore.view(), &mut self.grad)?;
        loss.penalty_grad(params, &mut self.grad);

        self.optimizer.update_params(params, &self.grad)
    }
}
