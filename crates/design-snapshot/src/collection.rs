//! Ordered collection editing
//!
//! [`CollectionEditor`] is the only place list-shaped snapshot data changes
//! shape. Every operation takes the current collection by reference and
//! returns a new one; untouched entries are shared with the input.

use im::Vector;
use std::marker::PhantomData;

/// Pure add/remove/replace-at-index over an [`im::Vector`]
///
/// Used for branch collections and, inside a branch, preference
/// collections. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionEditor<T> {
    _entry: PhantomData<T>,
}

impl<T: Clone> CollectionEditor<T> {
    /// Add `entry` at the end
    ///
    /// Never inspects or rewrites existing entries.
    #[inline]
    #[must_use]
    pub fn append(collection: &Vector<T>, entry: T) -> Vector<T> {
        let mut next = collection.clone();
        next.push_back(entry);
        next
    }

    /// Collection without the entry at `index`
    ///
    /// # Errors
    /// Returns [`CollectionError::IndexOutOfRange`] if `index >= len`
    pub fn remove_at(collection: &Vector<T>, index: usize) -> Result<Vector<T>, CollectionError> {
        check_index(index, collection.len())?;
        let mut next = collection.clone();
        next.remove(index);
        Ok(next)
    }

    /// Collection with the entry at `index` replaced
    ///
    /// # Errors
    /// Returns [`CollectionError::IndexOutOfRange`] if `index >= len`
    pub fn replace_at(
        collection: &Vector<T>,
        index: usize,
        entry: T,
    ) -> Result<Vector<T>, CollectionError> {
        check_index(index, collection.len())?;
        Ok(collection.update(index, entry))
    }

    /// Pad with `filler` or truncate so the result has exactly `len` entries
    #[must_use]
    pub fn aligned_to(collection: &Vector<T>, len: usize, mut filler: impl FnMut() -> T) -> Vector<T> {
        if collection.len() >= len {
            return collection.take(len);
        }
        let mut next = collection.clone();
        while next.len() < len {
            next.push_back(filler());
        }
        next
    }

    /// Remove `index` from a collection and from its parallel companion
    ///
    /// The companion (an error collection) is first aligned to the length of
    /// `collection`, so afterwards both have the same length and entry `j`
    /// of one still describes entry `j` of the other.
    ///
    /// # Errors
    /// Returns [`CollectionError::IndexOutOfRange`] if `index` is outside
    /// `collection`
    pub fn remove_aligned<E: Clone>(
        collection: &Vector<T>,
        companion: &Vector<E>,
        index: usize,
        filler: impl FnMut() -> E,
    ) -> Result<(Vector<T>, Vector<E>), CollectionError> {
        let next = Self::remove_at(collection, index)?;
        let aligned = CollectionEditor::<E>::aligned_to(companion, collection.len(), filler);
        let companion_next = CollectionEditor::<E>::remove_at(&aligned, index)?;
        Ok((next, companion_next))
    }
}

/// Validates a collection index.
///
/// An out-of-range index means the caller offered a position that was never
/// rendered. With the `strict-debug` feature this panics instead of
/// returning an error.
fn check_index(index: usize, len: usize) -> Result<(), CollectionError> {
    if index < len {
        return Ok(());
    }

    #[cfg(feature = "strict-debug")]
    panic!("collection index {index} out of range (len {len})");

    Err(CollectionError::IndexOutOfRange { index, len })
}

/// Errors from collection operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// Index outside the collection
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
