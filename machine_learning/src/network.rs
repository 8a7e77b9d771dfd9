use ndarray::{Array1, ArrayView1};

use crate::Result;

/// What the trainers need from a network.
///
/// A network keeps a flat parameter vector and a derivative accumulator of the same size.
/// `activate` is called once per timestep, in order, and `back_activate` once per timestep in
/// reverse order, each call adding the contribution of that timestep to the accumulator.
///
/// The accumulator holds the derivatives in the descent direction: `back_activate` receives
/// `target - output`, so adding a positive multiple of `derivs` to `params` lowers the error.
pub trait Network {
    /// The dimension of the inputs.
    fn input_dim(&self) -> usize;

    /// The dimension of the outputs.
    fn output_dim(&self) -> usize;

    /// Feeds one timestep forward.
    ///
    /// # Arguments
    /// * `input` - The input of the timestep.
    ///
    /// # Returns
    /// The output of the network or an error if the input has the wrong dimension.
    fn activate(&mut self, input: ArrayView1<f64>) -> Result<Array1<f64>>;

    /// Propagates the output error of the latest timestep not yet propagated.
    ///
    /// # Arguments
    /// * `out_err` - The output error of that timestep.
    ///
    /// # Returns
    /// The error with respect to the input of that timestep.
    fn back_activate(&mut self, out_err: ArrayView1<f64>) -> Result<Array1<f64>>;

    /// Clears the state carried between timesteps.
    fn reset(&mut self);

    /// Zeroes the derivative accumulator.
    fn reset_derivatives(&mut self);

    fn params(&self) -> &[f64];

    fn params_mut(&mut self) -> &mut [f64];

    fn derivs(&self) -> &[f64];

    /// The amount of parameters.
    fn size(&self) -> usize {
        self.params().len()
    }
}
