use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::FieldKind;

/// The result type used in the entire datasets module.
pub type Result<T> = std::result::Result<T, DatasetErr>;

/// The datasets module's error type.
#[derive(Debug)]
pub enum DatasetErr {
    ForbiddenFieldName(String),
    DuplicateFieldName(String),
    NoFields,
    UnknownField(String),
    SizesMismatch {
        got: usize,
        expected: usize,
    },
    IterablesMismatch {
        got: usize,
        expected: usize,
    },
    EmptyIterables,
    RowMismatch {
        got: usize,
        expected: usize,
    },
    OutOfSync {
        lengths: Vec<usize>,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    KindMismatch {
        expected: FieldKind,
        got: &'static str,
    },
    DimMismatch {
        got: usize,
        expected: usize,
    },
    InvalidProportion(f64),
    NotShareable,
    Io(io::Error),
}

impl Display for DatasetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetErr::ForbiddenFieldName(name) => write!(f, "forbidden field name: {name}"),
            DatasetErr::DuplicateFieldName(name) => {
                write!(f, "field {name} is declared more than once")
            }
            DatasetErr::NoFields => f.write_str("a dataset schema needs at least one field"),
            DatasetErr::UnknownField(name) => write!(f, "the dataset has no field named {name}"),
            DatasetErr::SizesMismatch { got, expected } => write!(
                f,
                "wrong number of field sizes supplied, got {got} and expected {expected}"
            ),
            DatasetErr::IterablesMismatch { got, expected } => write!(
                f,
                "wrong number of initializing iterables supplied, got {got} and expected {expected}"
            ),
            DatasetErr::EmptyIterables => {
                f.write_str("cannot infer field sizes, the initializing iterables are empty")
            }
            DatasetErr::RowMismatch { got, expected } => write!(
                f,
                "a row needs one item per field, got {got} and expected {expected}"
            ),
            DatasetErr::OutOfSync { lengths } => {
                write!(f, "dataset has unequal lengths for fields: {lengths:?}")
            }
            DatasetErr::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for a field of length {len}")
            }
            DatasetErr::KindMismatch { expected, got } => {
                write!(f, "expected an item for a {expected} field, got a {got}")
            }
            DatasetErr::DimMismatch { got, expected } => write!(
                f,
                "item dimension mismatch, got {got} and expected {expected}"
            ),
            DatasetErr::InvalidProportion(p) => {
                write!(f, "split proportion must lie within [0, 1], got {p}")
            }
            DatasetErr::NotShareable => {
                f.write_str("only datasets backed by shared containers can be shared")
            }
            DatasetErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for DatasetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DatasetErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DatasetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
