use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, linalg};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    arch::{activations::ActFn, check_dim, view_matrix, view_matrix_mut, view_vector, view_vector_mut},
};

/// A fully connected layer: `a = f(x W + b)`.
///
/// The layer doesn't own its parameters, it reads them from the slice its network hands it,
/// laid out as the weights in row major order followed by the biases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    dim: (usize, usize),
    #[serde(default)]
    act_fn: ActFn,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output dimensions.
    /// * `act_fn` - The activation applied to the outputs.
    pub fn new(dim: (usize, usize), act_fn: ActFn) -> Self {
        Self { dim, act_fn }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    /// Feeds `x` through the layer.
    ///
    /// # Returns
    /// The pre activation `z` and the activation `a`.
    pub fn forward(&self, params: &[f64], x: ArrayView1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        check_dim("dense layer input", x.len(), self.dim.0)?;

        let (w, b) = self.view_params(params)?;
        let z = x.dot(&w) + b;
        let a = z.mapv(|z| self.act_fn.f(z));

        Ok((z, a))
    }

    /// Propagates the error `d` at the output of the layer back to its input.
    ///
    /// # Arguments
    /// * `params` - The parameters of the layer.
    /// * `grad` - The layer's slice of the derivative accumulator.
    /// * `x` - The input fed on the matching forward pass.
    /// * `z` - The pre activation computed on the matching forward pass.
    /// * `d` - The error at the output.
    ///
    /// # Returns
    /// The error at the input.
    pub fn backward(
        &self,
        params: &[f64],
        grad: &mut [f64],
        x: ArrayView1<f64>,
        z: ArrayView1<f64>,
        mut d: Array1<f64>,
    ) -> Result<Array1<f64>> {
        check_dim("dense layer error", d.len(), self.dim.1)?;

        let act_fn = self.act_fn;
        d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));

        let (mut dw, mut db) = self.view_grad(grad)?;
        let x = x.insert_axis(Axis(1));
        linalg::general_mat_mul(1.0, &x, &d.view().insert_axis(Axis(0)), 1.0, &mut dw);
        db += &d;

        let (w, _) = self.view_params(params)?;
        Ok(w.dot(&d))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f64],
    ) -> Result<(ArrayViewMut2<'a, f64>, ArrayViewMut1<'a, f64>)> {
        check_dim("dense layer gradient", grad.len(), self.size())?;

        let (dw_raw, db_raw) = grad.split_at_mut(self.dim.0 * self.dim.1);
        let dw = view_matrix_mut("dense layer weights", dw_raw, self.dim)?;
        let db = view_vector_mut("dense layer biases", db_raw, self.dim.1)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f64]) -> Result<(ArrayView2<'a, f64>, ArrayView1<'a, f64>)> {
        check_dim("dense layer parameters", params.len(), self.size())?;

        let (w_raw, b_raw) = params.split_at(self.dim.0 * self.dim.1);
        let w = view_matrix("dense layer weights", w_raw, self.dim)?;
        let b = view_vector("dense layer biases", b_raw, self.dim.1)?;
        Ok((w, b))
    }
}
