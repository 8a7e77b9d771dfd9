pub mod activations;
pub mod layers;
mod recurrent;
mod sequential;

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

pub use recurrent::Recurrent;
pub use sequential::Sequential;

use crate::{MlErr, Result};

/// Views a raw slice as a matrix of the given shape.
pub(crate) fn view_matrix<'a>(
    what: &'static str,
    raw: &'a [f64],
    shape: (usize, usize),
) -> Result<ArrayView2<'a, f64>> {
    let got = raw.len();
    ArrayView2::from_shape(shape, raw).map_err(|_| MlErr::SizeMismatch {
        what,
        got,
        expected: shape.0 * shape.1,
    })
}

pub(crate) fn view_matrix_mut<'a>(
    what: &'static str,
    raw: &'a mut [f64],
    shape: (usize, usize),
) -> Result<ArrayViewMut2<'a, f64>> {
    let got = raw.len();
    ArrayViewMut2::from_shape(shape, raw).map_err(|_| MlErr::SizeMismatch {
        what,
        got,
        expected: shape.0 * shape.1,
    })
}

pub(crate) fn view_vector<'a>(
    what: &'static str,
    raw: &'a [f64],
    len: usize,
) -> Result<ArrayView1<'a, f64>> {
    let got = raw.len();
    ArrayView1::from_shape(len, raw).map_err(|_| MlErr::SizeMismatch {
        what,
        got,
        expected: len,
    })
}

pub(crate) fn view_vector_mut<'a>(
    what: &'static str,
    raw: &'a mut [f64],
    len: usize,
) -> Result<ArrayViewMut1<'a, f64>> {
    let got = raw.len();
    ArrayViewMut1::from_shape(len, raw).map_err(|_| MlErr::SizeMismatch {
        what,
        got,
        expected: len,
    })
}

/// Checks the dimension of a vector handed to a network.
pub(crate) fn check_dim(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
