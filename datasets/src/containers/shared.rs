use std::sync::Arc;

use parking_lot::RwLock;

use super::{ArrayContainer, Container, Item};
use crate::{FieldKind, Result};

/// A growable array that several handles can observe at once.
///
/// Every handle returned by `share` points to the same storage, appends made through any of
/// them are visible to all the others as soon as the write lock is released.
#[derive(Debug, Clone)]
pub struct SharedContainer {
    kind: FieldKind,
    dim: usize,
    inner: Arc<RwLock<ArrayContainer>>,
}

impl SharedContainer {
    pub fn new(kind: FieldKind, dim: usize) -> Self {
        Self {
            kind,
            dim,
            inner: Arc::new(RwLock::new(ArrayContainer::new(kind, dim))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    /// The amount of handles to this storage currently alive.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Container for SharedContainer {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }

    fn append(&mut self, item: Item) -> Result<()> {
        self.inner.write().append(item)
    }

    fn get(&self, idx: usize) -> Result<Item> {
        self.inner.read().get(idx)
    }

    fn finalize(&mut self) -> Result<()> {
        self.inner.write().finalize()
    }

    fn share(&self) -> Option<Box<dyn Container>> {
        Some(Box::new(self.clone()))
    }
}
