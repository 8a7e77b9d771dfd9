use ndarray::{Array1, Array2};

use crate::{DatasetErr, FieldKind, Result};

/// A single value stored in (or read from) a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Scalar(f64),
    Vector(Array1<f64>),
    Sequence(Array2<f64>),
}

impl Item {
    /// Builds a vector item from anything that can be turned into a `Vec<f64>`.
    pub fn vector(values: impl Into<Vec<f64>>) -> Self {
        Self::Vector(Array1::from_vec(values.into()))
    }

    /// Builds a sequence item from its rows.
    ///
    /// # Arguments
    /// * `dim` - The dimension of every row, needed to shape empty sequences.
    /// * `rows` - The rows of the sequence.
    ///
    /// # Returns
    /// The sequence or a `DimMismatch` error if any row doesn't have `dim` values.
    pub fn sequence<I, R>(dim: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let mut flat = Vec::new();
        let mut len = 0;

        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(DatasetErr::DimMismatch {
                    got: row.len(),
                    expected: dim,
                });
            }

            flat.extend_from_slice(row);
            len += 1;
        }

        let seq = Array2::from_shape_vec((len, dim), flat)
            .map_err(|_| DatasetErr::DimMismatch { got: 0, expected: dim })?;

        Ok(Self::Sequence(seq))
    }

    /// Returns the kind of field this item belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            Item::Scalar(_) => FieldKind::Scalars,
            Item::Vector(_) => FieldKind::Vectors,
            Item::Sequence(_) => FieldKind::Sequences,
        }
    }

    /// Returns the dimension of the item, for sequences the dimension of its rows.
    pub fn dim(&self) -> usize {
        match self {
            Item::Scalar(_) => 1,
            Item::Vector(v) => v.len(),
            Item::Sequence(s) => s.ncols(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Item::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            Item::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Array2<f64>> {
        match self {
            Item::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the item's values as a flat slice, rows one after the other for sequences.
    pub fn as_flat(&self) -> Option<&[f64]> {
        match self {
            Item::Scalar(x) => Some(std::slice::from_ref(x)),
            Item::Vector(v) => v.as_slice(),
            Item::Sequence(s) => s.as_slice(),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Item::Scalar(_) => "scalar",
            Item::Vector(_) => "vector",
            Item::Sequence(_) => "sequence",
        }
    }

    /// Checks that this item can be stored in a field of the given kind and dimension.
    pub(crate) fn check(&self, kind: FieldKind, dim: usize) -> Result<()> {
        if self.kind() != kind {
            return Err(DatasetErr::KindMismatch {
                expected: kind,
                got: self.kind_name(),
            });
        }

        if self.dim() != dim {
            return Err(DatasetErr::DimMismatch {
                got: self.dim(),
                expected: dim,
            });
        }

        Ok(())
    }
}

impl From<f64> for Item {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Array1<f64>> for Item {
    fn from(value: Array1<f64>) -> Self {
        Self::Vector(value)
    }
}

impl From<Array2<f64>> for Item {
    fn from(value: Array2<f64>) -> Self {
        Self::Sequence(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_builder_checks_rows() {
        let seq = Item::sequence(2, [[1., 2.], [3., 4.], [4., 5.]]).unwrap();
        assert_eq!(seq.dim(), 2);
        assert_eq!(seq.as_sequence().unwrap().nrows(), 3);

        let err = Item::sequence(2, [vec![1.], vec![2., 3.]]).unwrap_err();
        assert!(matches!(err, DatasetErr::DimMismatch { got: 1, expected: 2 }));

        let empty = Item::sequence(3, Vec::<Vec<f64>>::new()).unwrap();
        assert_eq!(empty.as_sequence().unwrap().dim(), (0, 3));
    }

    #[test]
    fn check_rejects_wrong_kind_and_dim() {
        let v = Item::vector([1., 2.]);
        assert!(v.check(FieldKind::Vectors, 2).is_ok());
        assert!(matches!(
            v.check(FieldKind::Scalars, 1),
            Err(DatasetErr::KindMismatch { .. })
        ));
        assert!(matches!(
            v.check(FieldKind::Vectors, 3),
            Err(DatasetErr::DimMismatch { got: 2, expected: 3 })
        ));
    }
}
