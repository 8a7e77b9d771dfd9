pub mod containers;
mod dataset;
mod error;
mod fields;
pub mod helpers;
pub mod schemas;

pub use containers::{Backend, Container, DiskOptions, Item};
pub use dataset::{Dataset, Row, Rows};
pub use error::{DatasetErr, Result};
pub use fields::{FieldKind, FieldSpec, Schema};
