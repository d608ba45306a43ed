//! Pluggable storage for datastore columns.
//!
//! This trait abstracts how a column's flat buffer is held. Columns keep
//! CPU-slice semantics so an external dispatch layer can map per-element
//! kernels over contiguous memory.

use core::fmt::{self, Debug};
use std::collections::TryReserveError;

/// Contiguous, indexable storage for `V` with slice access.
///
/// Resizing is split into a fallible [`try_reserve_len`](Storage::try_reserve_len)
/// and an infallible [`resize`](Storage::resize) so that a caller resizing
/// many columns can reserve everything first and only then mutate.
pub trait Storage<V>: Debug {
    /// Construct a buffer of `len`, filled with `fill`.
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone;

    /// Current length in elements.
    fn len(&self) -> usize;

    /// True when the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make sure a later `resize(new_len, ..)` will not need to allocate.
    fn try_reserve_len(&mut self, new_len: usize) -> Result<(), TryReserveError>;

    /// Resize to `new_len`, filling new cells with `fill` and keeping the
    /// first `min(old, new)` values.
    fn resize(&mut self, new_len: usize, fill: V)
    where
        V: Clone;

    /// Entire read-only buffer.
    fn as_slice(&self) -> &[V];

    /// Entire mutable buffer.
    fn as_mut_slice(&mut self) -> &mut [V];
}

/// `Vec`-backed storage (default).
#[derive(Clone, PartialEq)]
pub struct VecStorage<V>(pub(crate) Vec<V>);

impl<V> Debug for VecStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.0.len())
            .finish()
    }
}

impl<V> Storage<V> for VecStorage<V> {
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone,
    {
        Self(vec![fill; len])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn try_reserve_len(&mut self, new_len: usize) -> Result<(), TryReserveError> {
        self.0.try_reserve(new_len.saturating_sub(self.0.len()))
    }

    fn resize(&mut self, new_len: usize, fill: V)
    where
        V: Clone,
    {
        self.0.resize(new_len, fill);
    }

    fn as_slice(&self) -> &[V] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.0
    }
}

impl<V> From<Vec<V>> for VecStorage<V> {
    fn from(v: Vec<V>) -> Self {
        Self(v)
    }
}

impl<V> VecStorage<V> {
    pub fn into_inner(self) -> Vec<V> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_preserves_prefix_and_fills_tail() {
        let mut s = VecStorage::from(vec![1, 2, 3]);
        s.try_reserve_len(5).unwrap();
        s.resize(5, 0);
        assert_eq!(s.as_slice(), &[1, 2, 3, 0, 0]);
        s.resize(2, 0);
        assert_eq!(s.as_slice(), &[1, 2]);
        assert!(!s.is_empty());
    }

    #[test]
    fn reserve_shrinking_is_noop() {
        let mut s = VecStorage::<f64>::with_len(4, 1.5);
        s.try_reserve_len(1).unwrap();
        assert_eq!(s.len(), 4);
    }
}
