use datasets::{Item, Row};
use ndarray::{Array2, ArrayView1, Axis};

use crate::{MlErr, Result};

/// A dataset row seen as timesteps of `(input, target)` or `(input, target, importance)`.
///
/// Vector and scalar fields become sequences of a single timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    inputs: Array2<f64>,
    targets: Array2<f64>,
    importance: Option<Array2<f64>>,
}

impl Sequence {
    /// Builds a `Sequence` out of a dataset row.
    ///
    /// # Arguments
    /// * `row` - The row, made of the inputs, the targets and optionally the importance.
    ///
    /// # Returns
    /// The sequence or a `MalformedRow` error if the row doesn't have 2 or 3 fields or the
    /// fields have different amounts of timesteps.
    pub fn from_row(row: Row) -> Result<Self> {
        if !(2..=3).contains(&row.len()) {
            return Err(MlErr::MalformedRow(format!(
                "expected inputs, targets and an optional importance, got {} fields",
                row.len()
            )));
        }

        let mut fields = row.into_iter().map(timesteps);
        let (Some(inputs), Some(targets)) = (fields.next(), fields.next()) else {
            return Err(MlErr::MalformedRow("missing inputs or targets".into()));
        };

        let importance = fields.next();
        let seq = Self {
            inputs,
            targets,
            importance,
        };

        let len = seq.len();
        let lengths = [
            Some(seq.targets.nrows()),
            seq.importance.as_ref().map(Array2::nrows),
        ];

        if lengths.into_iter().flatten().any(|l| l != len) {
            return Err(MlErr::MalformedRow(
                "inputs, targets and importance have different lengths".into(),
            ));
        }

        if let Some(importance) = &seq.importance
            && importance.ncols() != seq.targets.ncols()
        {
            return Err(MlErr::SizeMismatch {
                what: "importance",
                got: importance.ncols(),
                expected: seq.targets.ncols(),
            });
        }

        Ok(seq)
    }

    /// The amount of timesteps.
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn target_dim(&self) -> usize {
        self.targets.ncols()
    }

    pub fn inputs(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.inputs.axis_iter(Axis(0))
    }

    pub fn input(&self, t: usize) -> ArrayView1<'_, f64> {
        self.inputs.row(t)
    }

    pub fn target(&self, t: usize) -> ArrayView1<'_, f64> {
        self.targets.row(t)
    }

    pub fn importance(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        self.importance.as_ref().map(|imp| imp.row(t))
    }
}

fn timesteps(item: Item) -> Array2<f64> {
    match item {
        Item::Scalar(x) => Array2::from_elem((1, 1), x),
        Item::Vector(v) => v.insert_axis(Axis(0)),
        Item::Sequence(s) => s,
    }
}
