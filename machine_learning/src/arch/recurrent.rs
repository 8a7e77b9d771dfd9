use ndarray::{Array1, ArrayView1, ArrayView2, Axis, linalg};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{check_dim, view_matrix, view_matrix_mut, view_vector, view_vector_mut};
use crate::{MlErr, Result, network::Network};

#[derive(Debug, Clone)]
struct Step {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    h: Array1<f64>,
}

/// An Elman network with a single recurrent hidden layer.
///
/// `h_t = tanh(x_t W + h_{t-1} U + b)` and `y_t = h_t V + c`, the parameters are laid out as
/// `W`, `U`, `b`, `V` and `c`, matrices in row major order.
///
/// Backpropagation through time carries the hidden error of the timestep just propagated into
/// the next `back_activate` call, until `reset` is called.
#[derive(Debug, Clone)]
pub struct Recurrent {
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    params: Vec<f64>,
    derivs: Vec<f64>,
    h: Array1<f64>,
    dh_next: Array1<f64>,
    steps: Vec<Step>,
}

/// Offsets of each parameter block.
struct Layout {
    w: (usize, usize),
    u: (usize, usize),
    b: (usize, usize),
    v: (usize, usize),
    c: (usize, usize),
}

struct Params<'a> {
    w: ArrayView2<'a, f64>,
    u: ArrayView2<'a, f64>,
    b: ArrayView1<'a, f64>,
    v: ArrayView2<'a, f64>,
    c: ArrayView1<'a, f64>,
}

impl Recurrent {
    /// Creates a new `Recurrent` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `input_dim` - The dimension of the inputs.
    /// * `hidden_dim` - The amount of hidden units.
    /// * `output_dim` - The dimension of the outputs.
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Self {
        let size = (input_dim + hidden_dim + 1) * hidden_dim + (hidden_dim + 1) * output_dim;

        Self {
            input_dim,
            hidden_dim,
            output_dim,
            params: vec![0.; size],
            derivs: vec![0.; size],
            h: Array1::zeros(hidden_dim),
            dh_next: Array1::zeros(hidden_dim),
            steps: Vec::new(),
        }
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
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

    fn layout(&self) -> Layout {
        let (i, h, o) = (self.input_dim, self.hidden_dim, self.output_dim);

        let w = (0, i * h);
        let u = (w.1, w.1 + h * h);
        let b = (u.1, u.1 + h);
        let v = (b.1, b.1 + h * o);
        let c = (v.1, v.1 + o);

        Layout { w, u, b, v, c }
    }

    fn view_params(&self) -> Result<Params<'_>> {
        let Layout { w, u, b, v, c } = self.layout();
        let (i, h, o) = (self.input_dim, self.hidden_dim, self.output_dim);
        let p = &self.params;

        Ok(Params {
            w: view_matrix("recurrent input weights", &p[w.0..w.1], (i, h))?,
            u: view_matrix("recurrent hidden weights", &p[u.0..u.1], (h, h))?,
            b: view_vector("recurrent hidden biases", &p[b.0..b.1], h)?,
            v: view_matrix("recurrent output weights", &p[v.0..v.1], (h, o))?,
            c: view_vector("recurrent output biases", &p[c.0..c.1], o)?,
        })
    }
}

impl Network for Recurrent {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn activate(&mut self, input: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_dim("recurrent input", input.len(), self.input_dim)?;

        let Params { w, u, b, v, c } = self.view_params()?;
        let h = (input.dot(&w) + self.h.dot(&u) + b).mapv(f64::tanh);
        let y = h.dot(&v) + c;

        self.steps.push(Step {
            x: input.to_owned(),
            h_prev: self.h.clone(),
            h: h.clone(),
        });
        self.h = h;

        Ok(y)
    }

    fn back_activate(&mut self, out_err: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_dim("recurrent output error", out_err.len(), self.output_dim)?;

        let step = self.steps.pop().ok_or(MlErr::SizeMismatch {
            what: "pending timesteps",
            got: 0,
            expected: 1,
        })?;

        let layout = self.layout();
        let (i, h, o) = (self.input_dim, self.hidden_dim, self.output_dim);
        let Params { w, u, v, .. } = self.view_params()?;

        let dh = v.dot(&out_err) + &self.dh_next;
        let dz = dh * step.h.mapv(|h| 1. - h * h);

        let input_err = w.dot(&dz);
        let dh_next = u.dot(&dz);

        let outer = |a: &Array1<f64>, b: ArrayView1<f64>| {
            (
                a.view().insert_axis(Axis(1)).to_owned(),
                b.insert_axis(Axis(0)).to_owned(),
            )
        };

        let d = &mut self.derivs;
        let blocks = [
            (layout.w, (i, h), outer(&step.x, dz.view())),
            (layout.u, (h, h), outer(&step.h_prev, dz.view())),
            (layout.v, (h, o), outer(&step.h, out_err)),
        ];

        for ((start, end), shape, (col, row)) in blocks {
            let mut block = view_matrix_mut("recurrent weight derivatives", &mut d[start..end], shape)?;
            linalg::general_mat_mul(1.0, &col, &row, 1.0, &mut block);
        }

        let mut db = view_vector_mut("recurrent hidden biases", &mut d[layout.b.0..layout.b.1], h)?;
        db += &dz;

        let mut dc = view_vector_mut("recurrent output biases", &mut d[layout.c.0..layout.c.1], o)?;
        dc += &out_err;

        self.dh_next = dh_next;
        Ok(input_err)
    }

    fn reset(&mut self) {
        self.h.fill(0.);
        self.dh_next.fill(0.);
        self.steps.clear();
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
