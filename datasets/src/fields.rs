use std::{collections::HashSet, fmt};

use parking_lot::{Mutex, const_mutex};
use serde::{Deserialize, Serialize};

use crate::{DatasetErr, Result};

/// Field names that would shadow the dataset's own handles.
const FORBIDDEN_NAMES: &[&str] = &["container"];

/// Global ticket counter, every `FieldSpec` takes the next number on creation.
static NEXT_TICKET: Mutex<u64> = const_mutex(0);

/// The kind of items a field stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Fixed-length vectors.
    Vectors,
    /// Plain numbers, implicitly of dimension 1.
    Scalars,
    /// Variable-length sequences of fixed-length vectors.
    Sequences,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Vectors => "vectors",
            FieldKind::Scalars => "scalars",
            FieldKind::Sequences => "sequences",
        };

        f.write_str(s)
    }
}

/// A declared field of a dataset schema.
///
/// Every spec draws a ticket from a process-wide counter when it is created, so a schema can
/// recover the declaration order of its fields regardless of the order they are handed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    ticket: u64,
}

impl FieldSpec {
    /// Declares a new field.
    ///
    /// # Arguments
    /// * `name` - The name of the field.
    /// * `kind` - The kind of items it holds.
    ///
    /// # Returns
    /// A new `FieldSpec` with a fresh ticket.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let ticket = {
            let mut next = NEXT_TICKET.lock();
            let ticket = *next;
            *next += 1;
            ticket
        };

        Self {
            name: name.into(),
            kind,
            ticket,
        }
    }

    pub fn vectors(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Vectors)
    }

    pub fn scalars(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalars)
    }

    pub fn sequences(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Sequences)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// An ordered set of field declarations, the "type" of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Creates a new `Schema`, ordering the fields by their declaration ticket.
    ///
    /// # Arguments
    /// * `fields` - The declared fields, in any order.
    ///
    /// # Returns
    /// The schema or a configuration error if there are no fields, a name is forbidden or a
    /// name is repeated.
    pub fn new<I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = FieldSpec>,
    {
        let mut fields: Vec<_> = fields.into_iter().collect();

        if fields.is_empty() {
            return Err(DatasetErr::NoFields);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for spec in &fields {
            if FORBIDDEN_NAMES.contains(&spec.name()) {
                return Err(DatasetErr::ForbiddenFieldName(spec.name.clone()));
            }

            if !seen.insert(spec.name()) {
                return Err(DatasetErr::DuplicateFieldName(spec.name.clone()));
            }
        }

        fields.sort_by_key(FieldSpec::ticket);
        Ok(Self { fields })
    }

    /// Returns the field names in declaration order.
    pub fn field_order(&self) -> Vec<&str> {
        self.fields.iter().map(FieldSpec::name).collect()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the position of the field called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|spec| spec.name() == name)
    }

    /// Returns the amount of fields that need an explicit size, that is, every non scalar field.
    pub fn sized_fields(&self) -> usize {
        self.fields
            .iter()
            .filter(|spec| spec.kind() != FieldKind::Scalars)
            .count()
    }
}
