use crate::error::Result;

/// An update strategy for the flat parameter buffer.
pub trait Optimizer {
    /// Applies one step to `params` given the freshly computed `grad`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
