use super::{Container, Item};
use crate::{DatasetErr, FieldKind, Result};

/// A plain list of owned items.
#[derive(Debug, Clone)]
pub struct ListContainer {
    kind: FieldKind,
    dim: usize,
    items: Vec<Item>,
}

impl ListContainer {
    pub fn new(kind: FieldKind, dim: usize) -> Self {
        Self {
            kind,
            dim,
            items: Vec::new(),
        }
    }
}

impl Container for ListContainer {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn append(&mut self, item: Item) -> Result<()> {
        item.check(self.kind, self.dim)?;
        self.items.push(item);
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<Item> {
        self.items
            .get(idx)
            .cloned()
            .ok_or(DatasetErr::IndexOutOfRange {
                index: idx,
                len: self.items.len(),
            })
    }

    fn finalize(&mut self) -> Result<()> {
        self.items.shrink_to_fit();
        Ok(())
    }
}
