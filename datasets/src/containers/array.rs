use ndarray::{Array1, Array2};

use super::{Container, INITIAL_CAPACITY, Item};
use crate::{DatasetErr, FieldKind, Result};

/// An in-process growable array.
///
/// Values are kept flat, one row of `dim` values after the other. Capacity is measured in rows
/// and doubles whenever an append doesn't fit, sequences keep the row each of them starts at.
#[derive(Debug, Clone)]
pub struct ArrayContainer {
    kind: FieldKind,
    dim: usize,
    data: Vec<f64>,
    fill: usize,
    capacity: usize,
    starts: Vec<usize>,
}

impl ArrayContainer {
    /// Creates a new empty `ArrayContainer` with room for the initial amount of rows.
    ///
    /// # Arguments
    /// * `kind` - The kind of items to store.
    /// * `dim` - The dimension of every row.
    pub fn new(kind: FieldKind, dim: usize) -> Self {
        Self {
            kind,
            dim,
            data: vec![0.0; INITIAL_CAPACITY * dim],
            fill: 0,
            capacity: INITIAL_CAPACITY,
            starts: Vec::new(),
        }
    }

    /// The amount of rows the backing storage can hold before growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The amount of rows in use.
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Makes room for `rows` more rows, doubling the capacity as many times as needed.
    fn reserve(&mut self, rows: usize) {
        let needed = self.fill + rows;
        if needed <= self.capacity {
            return;
        }

        let mut capacity = self.capacity;
        while capacity < needed {
            capacity = (capacity * 2).max(1);
        }

        self.data.resize(capacity * self.dim, 0.0);
        self.capacity = capacity;
    }

    fn rows(&self, start: usize, end: usize) -> &[f64] {
        &self.data[start * self.dim..end * self.dim]
    }
}

impl Container for ArrayContainer {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        match self.kind {
            FieldKind::Sequences => self.starts.len(),
            _ => self.fill,
        }
    }

    fn append(&mut self, item: Item) -> Result<()> {
        item.check(self.kind, self.dim)?;

        let rows = match &item {
            Item::Sequence(seq) => seq.nrows(),
            _ => 1,
        };

        self.reserve(rows);

        let offset = self.fill * self.dim;
        match &item {
            Item::Sequence(seq) => {
                for (i, value) in seq.iter().enumerate() {
                    self.data[offset + i] = *value;
                }

                self.starts.push(self.fill);
            }
            Item::Vector(v) => {
                for (i, value) in v.iter().enumerate() {
                    self.data[offset + i] = *value;
                }
            }
            Item::Scalar(x) => self.data[offset] = *x,
        }

        self.fill += rows;
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<Item> {
        let len = self.len();
        if idx >= len {
            return Err(DatasetErr::IndexOutOfRange { index: idx, len });
        }

        let item = match self.kind {
            FieldKind::Scalars => Item::Scalar(self.data[idx]),
            FieldKind::Vectors => Item::Vector(Array1::from(self.rows(idx, idx + 1).to_vec())),
            FieldKind::Sequences => {
                let start = self.starts[idx];
                let end = self.starts.get(idx + 1).copied().unwrap_or(self.fill);
                let values = self.rows(start, end).to_vec();

                let seq = Array2::from_shape_vec((end - start, self.dim), values).map_err(|_| {
                    DatasetErr::DimMismatch {
                        got: 0,
                        expected: self.dim,
                    }
                })?;

                Item::Sequence(seq)
            }
        };

        Ok(item)
    }

    fn finalize(&mut self) -> Result<()> {
        self.data.truncate(self.fill * self.dim);
        self.data.shrink_to_fit();
        self.capacity = self.fill;
        Ok(())
    }
}
