//! Copy-on-write ordered collection.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Reconcilable;
use crate::models::RecordId;

/// An ordered, immutable list of records.
///
/// Every change produces a new collection backed by a fresh allocation, so a
/// snapshot handed out earlier never changes under its holder. Use
/// [`Collection::ptr_eq`] to tell whether anything changed at all.
#[derive(Debug)]
pub struct Collection<R> {
    items: Arc<Vec<R>>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<R: PartialEq> PartialEq for Collection<R> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<R> Collection<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[R] {
        &self.items
    }

    /// True when both collections share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<R: Clone> Collection<R> {
    /// Returns a new collection built by running `f` on a copy of the items.
    pub fn with(&self, f: impl FnOnce(&mut Vec<R>)) -> Self {
        let mut items = self.items.as_ref().clone();
        f(&mut items);
        Self::new(items)
    }

    pub fn to_vec(&self) -> Vec<R> {
        self.items.as_ref().clone()
    }
}

impl<R: Reconcilable> Collection<R> {
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.items.iter().position(|r| r.record_id() == id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&R> {
        self.items.iter().find(|r| r.record_id() == id)
    }

    /// Records whose identifier is still provisional.
    pub fn provisional(&self) -> impl Iterator<Item = &R> {
        self.items.iter().filter(|r| r.record_id().is_provisional())
    }
}

impl<'a, R> IntoIterator for &'a Collection<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<R> FromIterator<R> for Collection<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<R: Serialize> Serialize for Collection<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.as_slice().serialize(serializer)
    }
}

impl<'de, R: Deserialize<'de>> Deserialize<'de> for Collection<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<R>::deserialize(deserializer).map(Self::new)
    }
}
