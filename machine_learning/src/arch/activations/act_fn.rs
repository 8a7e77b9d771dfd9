use serde::{Deserialize, Serialize};

/// The activation function applied by a layer to each of its outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    Sigmoid,
    Tanh,
    #[default]
    Identity,
}
use ActFn::*;

impl ActFn {
    pub fn f(&self, z: f64) -> f64 {
        match self {
            Sigmoid => 1. / (1. + (-z).exp()),
            Tanh => z.tanh(),
            Identity => z,
        }
    }

    /// The derivative evaluated at the pre activation `z`.
    pub fn df(&self, z: f64) -> f64 {
        match self {
            Sigmoid => {
                let s = self.f(z);
                s * (1. - s)
            }
            Tanh => 1. - z.tanh().powi(2),
            Identity => 1.,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn derivatives_match_finite_differences() {
        let eps = 1e-6;

        for act_fn in [Sigmoid, Tanh, Identity] {
            for z in [-2., -0.3, 0., 0.7, 3.] {
                let numerical = (act_fn.f(z + eps) - act_fn.f(z - eps)) / (2. * eps);
                assert_abs_diff_eq!(act_fn.df(z), numerical, epsilon = 1e-8);
            }
        }
    }
}
