mod array;
mod disk;
mod item;
mod list;
mod shared;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use array::ArrayContainer;
pub use disk::{DiskContainer, DiskOptions, needs_new_file};
pub use item::Item;
pub use list::ListContainer;
pub use shared::SharedContainer;

use crate::{FieldKind, Result};

/// Rows every growable array starts with.
pub const INITIAL_CAPACITY: usize = 128;

/// Backend storage for a single field.
///
/// All backends share the same contract: items are appended at the end, read back by logical
/// index, and `finalize` releases any slack storage once producing is done.
pub trait Container: Send + Sync {
    /// The kind of items stored.
    fn kind(&self) -> FieldKind;

    /// The dimension of the stored items, for sequences the dimension of each row.
    fn dim(&self) -> usize;

    /// The amount of items stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an item at the next logical slot.
    ///
    /// # Errors
    /// If the item doesn't match the container's kind or dimension, or on io failures.
    fn append(&mut self, item: Item) -> Result<()>;

    /// Reads the item at `idx`.
    ///
    /// # Errors
    /// An `IndexOutOfRange` error if `idx >= len`, or an io error for disk backed containers.
    fn get(&self, idx: usize) -> Result<Item>;

    /// Frees any superfluous storage.
    fn finalize(&mut self) -> Result<()>;

    /// Returns a second handle to the same storage, only available for shared containers.
    fn share(&self) -> Option<Box<dyn Container>> {
        None
    }
}

/// Selects the storage backend for every field of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Growable in-process arrays with geometric growth.
    #[default]
    Array,
    /// A plain list of owned items.
    List,
    /// Data spread across size capped files on disk.
    Disk(DiskOptions),
    /// Growable arrays that can be observed through several handles at once.
    Shared,
}

impl Backend {
    /// Creates a disk backend writing into `dir` with the default options.
    pub fn disk(dir: impl Into<PathBuf>) -> Self {
        Self::Disk(DiskOptions {
            dir: dir.into(),
            ..DiskOptions::default()
        })
    }
}

/// Creates an empty container for a field.
///
/// # Arguments
/// * `kind` - The kind of field.
/// * `dim` - The dimension of its items, ignored for scalars.
/// * `backend` - Where the items are going to be stored.
///
/// # Returns
/// A boxed container or an io error if the disk backend can't prepare its directory.
pub fn container_for(kind: FieldKind, dim: usize, backend: &Backend) -> Result<Box<dyn Container>> {
    let dim = match kind {
        FieldKind::Scalars => 1,
        _ => dim,
    };

    let container: Box<dyn Container> = match backend {
        Backend::Array => Box::new(ArrayContainer::new(kind, dim)),
        Backend::List => Box::new(ListContainer::new(kind, dim)),
        Backend::Disk(options) => Box::new(DiskContainer::new(kind, dim, options.clone())?),
        Backend::Shared => Box::new(SharedContainer::new(kind, dim)),
    };

    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_deserializes_from_snake_case() {
        let backend: Backend = serde_json::from_str(r#""shared""#).unwrap();
        assert_eq!(backend, Backend::Shared);

        let backend: Backend =
            serde_json::from_str(r#"{"disk": {"dir": "/tmp/data", "keep_files": true}}"#).unwrap();

        let Backend::Disk(options) = backend else {
            panic!("expected a disk backend");
        };

        assert_eq!(options.dir, PathBuf::from("/tmp/data"));
        assert!(options.keep_files);
        assert_eq!(options.max_file_size, disk::MAX_FILE_SIZE);
    }

    #[test]
    fn scalars_always_have_dimension_one() {
        for backend in [Backend::Array, Backend::List, Backend::Shared] {
            let container = container_for(FieldKind::Scalars, 7, &backend).unwrap();
            assert_eq!(container.dim(), 1);
        }
    }
}
