use std::cmp::Ordering;
use std::hash::Hash;

use crate::error::IndexError;

/// Something that can live in an [`OrderedIndex`].
pub trait Element {
    type Key: Eq + Hash + Clone;

    /// Returns the identity of the element. Unique within an index.
    fn key(&self) -> &Self::Key;

    /// Total order of the index. `Less` means `self` takes the lower rank.
    fn rank_cmp(&self, other: &Self) -> Ordering;
}

/// Rank-aware ordered set of uniquely keyed elements.
///
/// Ranks are one-based: rank 1 is the element that sorts first.
pub trait OrderedIndex<E: Element> {
    /// Inserts an element.
    /// Fails with `DuplicateKey` if an element with the same key is indexed.
    fn insert(&mut self, element: E) -> Result<(), IndexError>;

    /// Removes and returns the element stored under `key`.
    fn delete_by_key(&mut self, key: &E::Key) -> Result<E, IndexError>;

    /// Returns the element stored under `key`, without resolving its rank.
    fn get(&self, key: &E::Key) -> Option<&E>;

    /// Returns true if an element is stored under `key`.
    fn contains(&self, key: &E::Key) -> bool {
        self.get(key).is_some()
    }

    /// Returns the one-based rank of the element stored under `key`.
    fn rank_by_key(&self, key: &E::Key) -> Result<usize, IndexError>;

    /// Returns the rank of `key` counted from the element that sorts last.
    fn reverse_rank_by_key(&self, key: &E::Key) -> Result<usize, IndexError> {
        let rank = self.rank_by_key(key)?;
        Ok(self.count() - rank + 1)
    }

    /// Returns the element at `rank`, failing with `OutOfRange` outside `1..=count()`.
    fn element_by_rank(&self, rank: usize) -> Result<&E, IndexError>;

    /// Returns the elements ranked `start..=end` in ascending rank order.
    /// `end` is clamped to `count()`; a `start` past the end yields nothing.
    fn range_by_rank(&self, start: usize, end: usize) -> Result<Vec<&E>, IndexError>;

    /// Returns the number of indexed elements.
    fn count(&self) -> usize;
}
