use log::debug;
use rand::{Rng, seq::index};

use crate::{
    Backend, DatasetErr, FieldKind, Result, Schema,
    containers::{Container, Item, container_for},
};

/// A row of a dataset, one item per field in declaration order.
pub type Row = Vec<Item>;

/// A set of named fields, each one stored in its own container.
///
/// All the containers share the same backend, chosen when the dataset is built. A well formed
/// dataset has the same amount of items in every field, this is only checked by `len` and
/// `iter`, random access through `get` only checks the bounds of each field.
pub struct Dataset {
    schema: Schema,
    backend: Backend,
    fields: Vec<Box<dyn Container>>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("schema", &self.schema)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Creates a new empty `Dataset`.
    ///
    /// # Arguments
    /// * `schema` - The fields of the dataset.
    /// * `sizes` - The dimension of every non scalar field, in declaration order. Scalar fields
    ///   are always of dimension 1 and take no entry.
    /// * `backend` - The storage used for every field.
    ///
    /// # Returns
    /// The dataset or a `SizesMismatch` error if the amount of sizes is wrong.
    pub fn from_sizes(schema: Schema, sizes: &[usize], backend: Backend) -> Result<Self> {
        let expected = schema.sized_fields();
        if sizes.len() != expected {
            return Err(DatasetErr::SizesMismatch {
                got: sizes.len(),
                expected,
            });
        }

        let mut sizes = sizes.iter().copied();
        let fields = schema
            .fields()
            .iter()
            .map(|spec| {
                let dim = match spec.kind() {
                    FieldKind::Scalars => 1,
                    _ => sizes.next().unwrap_or_default(),
                };

                container_for(spec.kind(), dim, &backend)
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            schema,
            backend,
            fields,
        })
    }

    /// Creates a new `Dataset` filled with the given columns.
    ///
    /// The dimension of every field is taken from its first item. Rows are taken until any of
    /// the columns runs out.
    ///
    /// # Arguments
    /// * `schema` - The fields of the dataset.
    /// * `columns` - One iterable per field, in declaration order.
    /// * `backend` - The storage used for every field.
    ///
    /// # Errors
    /// `IterablesMismatch` if the amount of columns doesn't match the fields, `EmptyIterables`
    /// if any column is empty, or any error raised while appending the rows.
    pub fn from_iterables<I>(schema: Schema, columns: Vec<I>, backend: Backend) -> Result<Self>
    where
        I: IntoIterator<Item = Item>,
    {
        if columns.len() != schema.len() {
            return Err(DatasetErr::IterablesMismatch {
                got: columns.len(),
                expected: schema.len(),
            });
        }

        let mut columns: Vec<_> = columns.into_iter().map(IntoIterator::into_iter).collect();

        let first = columns
            .iter_mut()
            .map(Iterator::next)
            .collect::<Option<Row>>()
            .ok_or(DatasetErr::EmptyIterables)?;

        let sizes: Vec<_> = schema
            .fields()
            .iter()
            .zip(&first)
            .filter(|(spec, _)| spec.kind() != FieldKind::Scalars)
            .map(|(_, item)| item.dim())
            .collect();

        let mut dataset = Self::from_sizes(schema, &sizes, backend)?;
        dataset.append_row(first)?;

        while let Some(row) = columns.iter_mut().map(Iterator::next).collect::<Option<Row>>() {
            dataset.append_row(row)?;
        }

        Ok(dataset)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Returns the field names in declaration order.
    pub fn field_order(&self) -> Vec<&str> {
        self.schema.field_order()
    }

    /// Returns the dimension of every field.
    pub fn dims(&self) -> Vec<usize> {
        self.fields.iter().map(|field| field.dim()).collect()
    }

    /// Returns the amount of rows in the dataset.
    ///
    /// # Errors
    /// `OutOfSync` if the fields don't all have the same length.
    pub fn len(&self) -> Result<usize> {
        let lengths: Vec<_> = self.fields.iter().map(|field| field.len()).collect();

        match lengths.split_first() {
            Some((first, rest)) if rest.iter().any(|len| len != first) => {
                Err(DatasetErr::OutOfSync { lengths })
            }
            Some((first, _)) => Ok(*first),
            None => Ok(0),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns a fresh traversal over the rows of the dataset.
    ///
    /// # Errors
    /// `OutOfSync` if the fields don't all have the same length.
    pub fn iter(&self) -> Result<Rows<'_>> {
        let len = self.len()?;
        Ok(Rows {
            dataset: self,
            next: 0,
            len,
        })
    }

    /// Reads the row at `idx`, without checking that the fields are in sync.
    ///
    /// # Errors
    /// `IndexOutOfRange` if any field has no item at `idx`.
    pub fn get(&self, idx: usize) -> Result<Row> {
        self.fields.iter().map(|field| field.get(idx)).collect()
    }

    /// Appends one item to every field.
    ///
    /// The items must be given in declaration order. If appending fails halfway through the
    /// fields already written keep their item and the dataset is left out of sync.
    pub fn append_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(DatasetErr::RowMismatch {
                got: row.len(),
                expected: self.fields.len(),
            });
        }

        for (field, item) in self.fields.iter_mut().zip(row) {
            field.append(item)?;
        }

        Ok(())
    }

    /// Returns the container of the field called `name`.
    pub fn field(&self, name: &str) -> Result<&dyn Container> {
        let idx = self.position(name)?;
        Ok(self.fields[idx].as_ref())
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut dyn Container> {
        let idx = self.position(name)?;
        Ok(self.fields[idx].as_mut())
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.schema
            .position(name)
            .ok_or_else(|| DatasetErr::UnknownField(name.to_string()))
    }

    /// Trims the storage of every field.
    pub fn finalize(&mut self) -> Result<()> {
        self.fields.iter_mut().try_for_each(|field| field.finalize())
    }

    /// Returns a second handle observing the same storage.
    ///
    /// # Errors
    /// `NotShareable` unless every field uses the shared backend.
    pub fn shared_clone(&self) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|field| field.share().ok_or(DatasetErr::NotShareable))
            .collect::<Result<_>>()?;

        Ok(Self {
            schema: self.schema.clone(),
            backend: self.backend.clone(),
            fields,
        })
    }

    /// Creates an empty dataset with the same fields, dimensions and backend as this one.
    pub fn empty_like(&self) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|field| container_for(field.kind(), field.dim(), &self.backend))
            .collect::<Result<_>>()?;

        Ok(Self {
            schema: self.schema.clone(),
            backend: self.backend.clone(),
            fields,
        })
    }

    /// Splits the dataset in two disjoint partitions.
    ///
    /// The first partition takes `floor(len * proportion)` rows chosen uniformly at random,
    /// the second one takes the rest. Both keep the rows in their original order.
    ///
    /// # Arguments
    /// * `proportion` - The fraction of rows for the first partition, within `[0, 1]`.
    /// * `rng` - The source of randomness used to choose the rows.
    ///
    /// # Errors
    /// `InvalidProportion` if `proportion` is out of range, `OutOfSync` if the fields don't all
    /// have the same length.
    pub fn split_with_proportion<R>(&self, proportion: f64, rng: &mut R) -> Result<(Self, Self)>
    where
        R: Rng + ?Sized,
    {
        if !(0.0..=1.0).contains(&proportion) {
            return Err(DatasetErr::InvalidProportion(proportion));
        }

        let len = self.len()?;
        let amount = (len as f64 * proportion).floor() as usize;

        let mut in_left = vec![false; len];
        for idx in index::sample(rng, len, amount) {
            in_left[idx] = true;
        }

        let mut left = self.empty_like()?;
        let mut right = self.empty_like()?;

        for (idx, goes_left) in in_left.into_iter().enumerate() {
            let row = self.get(idx)?;
            match goes_left {
                true => left.append_row(row)?,
                false => right.append_row(row)?,
            }
        }

        debug!("split {len} rows into {amount} and {}", len - amount);
        Ok((left, right))
    }
}

/// A traversal over the rows of a dataset.
pub struct Rows<'a> {
    dataset: &'a Dataset,
    next: usize,
    len: usize,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }

        let row = self.dataset.get(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}
