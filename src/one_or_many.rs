//! Object-or-array coercion
//!
//! The SDMX JSON service serializes a repeated element as a bare object when
//! there is exactly one of it and as an array otherwise. [`OneOrMany`] absorbs
//! both shapes at deserialization time so callers always work with a list.

use serde::{Deserialize, Serialize};

/// A value that the server may send either alone or as an array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Array form
    Many(Vec<T>),
    /// Single-object form
    Single(T),
}

impl<T> OneOrMany<T> {
    /// Coerce into a list of zero or more items
    pub fn into_list(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::Single(item) => vec![item],
        }
    }

    /// Borrowing view as a list
    pub fn to_list(&self) -> Vec<&T> {
        match self {
            OneOrMany::Many(items) => items.iter().collect(),
            OneOrMany::Single(item) => vec![item],
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::Many(items) => items.len(),
            OneOrMany::Single(_) => 1,
        }
    }

    /// Whether there are no items (only possible for an empty array)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_list()
    }
}
