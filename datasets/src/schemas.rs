//! Schemas for the common kinds of datasets.

use crate::{FieldSpec, Result, Schema};

/// Supervised regression: `inputs` and `targets` vectors.
pub fn regression() -> Result<Schema> {
    Schema::new([FieldSpec::vectors("inputs"), FieldSpec::vectors("targets")])
}

/// Supervised regression over sequences: `inputs` and `targets` sequences of equal length.
pub fn sequence_regression() -> Result<Schema> {
    Schema::new([
        FieldSpec::sequences("inputs"),
        FieldSpec::sequences("targets"),
    ])
}

/// Sequence regression where every timestep carries a per component `importance` weight.
pub fn importance_sequence_regression() -> Result<Schema> {
    Schema::new([
        FieldSpec::sequences("inputs"),
        FieldSpec::sequences("targets"),
        FieldSpec::sequences("importance"),
    ])
}

/// Unlabeled `samples`.
pub fn unsupervised() -> Result<Schema> {
    Schema::new([FieldSpec::vectors("samples")])
}
