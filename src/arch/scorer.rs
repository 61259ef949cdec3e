use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::layout::ParameterLayout;
use crate::{
    error::{RankErr, Result},
    stats::sigmoid,
};

/// Forward-pass products kept around for the backward pass.
#[derive(Debug, Clone)]
pub struct Activations {
    pub scores: Array1<f32>,
    // Post-sigmoid hidden activations; (0, 0) placeholder for the
    // linear layout.
    hidden: Array2<f32>,
}

/// Scores rows of a dense feature matrix with the current parameters.
///
/// The zero-hidden case is a plain linear map, the one-hidden case is
/// linear -> sigmoid -> linear. The scorer never owns parameters, it
/// interprets a flat slice through its `ParameterLayout`. Pure: two
/// calls with the same inputs produce the same scores.
#[derive(Debug, Clone)]
pub struct Scorer {
    layout: ParameterLayout,
}

impl Scorer {
    pub fn new(layout: ParameterLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<()> {
        if len != self.layout.len() {
            return Err(RankErr::LengthMismatch {
                what,
                got: len,
                expected: self.layout.len(),
            });
        }

        Ok(())
    }

    /// One scalar per row of `x`, in row order.
    pub fn score(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array1<f32>> {
        Ok(self.forward(params, x)?.scores)
    }

    /// Runs the forward pass and keeps the intermediates `backward` needs.
    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Activations> {
        self.check_len("params", params.len())?;

        match &self.layout {
            ParameterLayout::Linear { w, b } => {
                let wv = ArrayView1::from_shape(w.len(), &params[w.clone()]).unwrap();
                let scores = x.dot(&wv) + params[b.start];

                Ok(Activations {
                    scores,
                    hidden: Array2::zeros((0, 0)),
                })
            }
            ParameterLayout::OneHidden {
                num_feats,
                num_hidden,
                w1,
                b1,
                w2,
                b2,
            } => {
                let w1v =
                    ArrayView2::from_shape((*num_feats, *num_hidden), &params[w1.clone()]).unwrap();
                let b1v = ArrayView1::from_shape(*num_hidden, &params[b1.clone()]).unwrap();
                let w2v = ArrayView1::from_shape(*num_hidden, &params[w2.clone()]).unwrap();

                let mut z = x.dot(&w1v);
                z += &b1v;
                z.mapv_inplace(sigmoid);
                let hidden = z;

                let scores = hidden.dot(&w2v) + params[b2.start];

                Ok(Activations { scores, hidden })
            }
        }
    }

    /// Accumulates `d cost / d params` into `grad`, given `d cost / d score`
    /// per row.
    ///
    /// `x` and `acts` must come from the matching `forward` call on the
    /// same parameters. The method adds into `grad`; callers zero the
    /// buffer between gradient evaluations.
    pub fn backward(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        acts: &Activations,
        dscore: ArrayView1<f32>,
        grad: &mut [f32],
    ) -> Result<()> {
        self.check_len("params", params.len())?;
        self.check_len("grad", grad.len())?;
        if dscore.len() != x.nrows() {
            return Err(RankErr::LengthMismatch {
                what: "dscore",
                got: dscore.len(),
                expected: x.nrows(),
            });
        }

        match &self.layout {
            ParameterLayout::Linear { w, b } => {
                let dw = x.t().dot(&dscore);
                for (g, d) in grad[w.clone()].iter_mut().zip(dw.iter()) {
                    *g += d;
                }
                grad[b.start] += dscore.sum();
            }
            ParameterLayout::OneHidden {
                num_hidden,
                w1,
                b1,
                w2,
                b2,
                ..
            } => {
                let w2v = ArrayView1::from_shape(*num_hidden, &params[w2.clone()]).unwrap();

                // Output layer: dw2 = hᵀ·dscore, db2 = Σ dscore.
                let dw2 = acts.hidden.t().dot(&dscore);
                for (g, d) in grad[w2.clone()].iter_mut().zip(dw2.iter()) {
                    *g += d;
                }
                grad[b2.start] += dscore.sum();

                // Through the sigmoid: dz = (dscore ⊗ w2) · h · (1 - h).
                let mut dz = acts.hidden.mapv(|h| h * (1. - h));
                for (mut row, &ds) in dz.rows_mut().into_iter().zip(dscore.iter()) {
                    row *= ds;
                }
                dz *= &w2v;

                // Input layer: dW1 = xᵀ·dz, db1 = column sums of dz.
                let dw1 = x.t().dot(&dz);
                for (g, d) in grad[w1.clone()].iter_mut().zip(dw1.iter()) {
                    *g += d;
                }
                let db1 = dz.sum_axis(Axis(0));
                for (g, d) in grad[b1.clone()].iter_mut().zip(db1.iter()) {
                    *g += d;
                }
            }
        }

        Ok(())
    }
}
