use crate::Result;

pub trait Optimizer {
    /// Takes one step from `params` following `grad`.
    ///
    /// # Errors
    /// A `SizeMismatch` error if `params` and `grad` have different lengths.
    fn update_params(&mut self, params: &mut [f64], grad: &[f64]) -> Result<()>;
}
