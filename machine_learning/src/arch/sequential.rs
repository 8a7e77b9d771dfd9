use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{check_dim, layers::Dense};
use crate::{MlErr, Result, network::Network};

/// What a layer saw on one forward pass.
#[derive(Debug, Clone)]
struct Trace {
    x: Array1<f64>,
    z: Array1<f64>,
}

/// A feedforward stack of dense layers.
///
/// Every call to `activate` pushes the inputs and pre activations of each layer, the matching
/// `back_activate` pops them, so timesteps are propagated back in reverse order.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
    params: Vec<f64>,
    derivs: Vec<f64>,
    traces: Vec<Vec<Trace>>,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` or an error if there are no layers or two consecutive layers don't
    /// fit together.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dense>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(MlErr::Config("a sequential needs at least one layer".into()));
        }

        for pair in layers.windows(2) {
            check_dim("consecutive layers", pair[1].dim().0, pair[0].dim().1)?;
        }

        let size = layers.iter().map(Dense::size).sum();

        Ok(Self {
            layers,
            params: vec![0.; size],
            derivs: vec![0.; size],
            traces: Vec::new(),
        })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Draws every parameter from a normal distribution centered at zero.
    ///
    /// # Errors
    /// A `Config` error if `std_dev` is negative or not finite.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, std_dev: f64) -> Result<()> {
        let normal = Normal::new(0., std_dev).map_err(|e| MlErr::Config(e.to_string()))?;
        self.params.iter_mut().for_each(|p| *p = normal.sample(rng));
        Ok(())
    }
}

impl Network for Sequential {
    fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.dim().0)
    }

    fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.dim().1)
    }

    fn activate(&mut self, input: ArrayView1<f64>) -> Result<Array1<f64>> {
        let mut x = input.to_owned();
        let mut traces = Vec::with_capacity(self.layers.len());
        let mut offset = 0;

        for layer in &self.layers {
            let params = &self.params[offset..offset + layer.size()];
            let (z, a) = layer.forward(params, x.view())?;

            traces.push(Trace { x, z });
            x = a;
            offset += layer.size();
        }

        self.traces.push(traces);
        Ok(x)
    }

    fn back_activate(&mut self, out_err: ArrayView1<f64>) -> Result<Array1<f64>> {
        let traces = self.traces.pop().ok_or(MlErr::SizeMismatch {
            what: "pending timesteps",
            got: 0,
            expected: 1,
        })?;

        let mut d = out_err.to_owned();
        let mut end = self.params.len();

        for (layer, trace) in self.layers.iter().zip(&traces).rev() {
            let start = end - layer.size();
            d = layer.backward(
                &self.params[start..end],
                &mut self.derivs[start..end],
                trace.x.view(),
                trace.z.view(),
                d,
            )?;
            end = start;
        }

        Ok(d)
    }

    fn reset(&mut self) {
        self.traces.clear();
    }

    fn reset_derivatives(&mut self) {
        self.derivs.fill(0.);
    }

    fn params(&self) -> &[f64] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn derivs(&self) -> &[f64] {
        &self.derivs
    }
}
