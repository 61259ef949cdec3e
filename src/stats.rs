//! Small evaluation helpers shared by the loss and by callers judging
//! model quality before and after training.

use ndarray::ArrayView1;

/// Logistic sigmoid.
#[inline]
pub fn sigmoid(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}

/// Root mean square error of `values` against a single scalar target.
pub fn rmse(values: ArrayView1<f32>, target: f32) -> f32 {
    values
        .mapv(|v| (v - target).powi(2))
        .mean()
        .unwrap_or_default()
        .sqrt()
}

/// Fraction of `values` that land on the same side of 0.5 as `target`.
pub fn accuracy(values: ArrayView1<f32>, target: f32) -> f32 {
    if values.is_empty() {
        return 0.;
    }

    let hits = values
        .iter()
        .filter(|&&v| (v >= 0.5) == (target >= 0.5))
        .count();

    hits as f32 / values.len() as f32
}
