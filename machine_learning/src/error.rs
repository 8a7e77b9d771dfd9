use std::{
    error::Error,
    fmt::{self, Display},
};

use datasets::DatasetErr;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    Dataset(DatasetErr),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    MalformedRow(String),
    EmptyDataset,
    ZeroPonderation,
    DatasetTooSmall {
        validation_proportion: f64,
    },
    Config(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::Dataset(e) => write!(f, "dataset error: {e}"),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::MalformedRow(reason) => write!(f, "malformed dataset row: {reason}"),
            MlErr::EmptyDataset => f.write_str("Dataset cannot be empty"),
            MlErr::ZeroPonderation => {
                f.write_str("total ponderation is zero, the error can't be averaged")
            }
            MlErr::DatasetTooSmall {
                validation_proportion,
            } => write!(
                f,
                "Provided dataset too small to be split into training and validation sets with proportion {validation_proportion}"
            ),
            MlErr::Config(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DatasetErr> for MlErr {
    fn from(value: DatasetErr) -> Self {
        Self::Dataset(value)
    }
}
