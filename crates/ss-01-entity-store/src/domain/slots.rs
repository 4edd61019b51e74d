//! Storage slots.
//!
//! A slot is the in-memory home of one entity file. Slots are never removed
//! during a run; a deleted entity leaves an empty slot so indices stay stable.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Slot<T> {
    pub path: PathBuf,
    /// `None` marks the file for deletion on commit.
    pub entity: Option<T>,
    /// False once `unbind` has dropped the slot from the lookup indices.
    pub bound: bool,
}

impl<T> Slot<T> {
    pub fn new(path: PathBuf, entity: T) -> Self {
        Self {
            path,
            entity: Some(entity),
            bound: true,
        }
    }
}

/// A borrowed view of a live entity.
#[derive(Debug)]
pub struct Entry<'a, T> {
    pub index: usize,
    pub path: &'a Path,
    pub entity: &'a T,
}

impl<'a, T> Clone for Entry<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Entry<'a, T> {}

impl<'a, T> Entry<'a, T> {
    pub(crate) fn from_slot(index: usize, slot: &'a Slot<T>) -> Option<Self> {
        slot.entity.as_ref().map(|entity| Entry {
            index,
            path: &slot.path,
            entity,
        })
    }
}
