use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{RankError, Result};
use crate::index::{Element, OrderedIndex};
use crate::rank::board::BoardCore;
use crate::rank::score::{RankKey, Score};

/// One entry on a [`RankBoard`](crate::RankBoard).
///
/// Rankers sort by `value` descending, then by `updated_at` ascending, so among
/// equal values the one that got there first ranks higher.
///
/// A ranker handed out by a board remembers that board weakly and can report its
/// own rank through [`Ranker::rank`].
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ranker<K: RankKey, V: Score> {
    pub key: K,
    pub value: V,
    /// Unix time in milliseconds of the last change to `value`.
    pub updated_at: i64,
    #[cfg_attr(feature = "serde", serde(skip))]
    board: BoardRef<K, V>,
}

impl<K: RankKey, V: Score> Ranker<K, V> {
    pub fn new(key: K, value: V, updated_at: i64) -> Self {
        Self {
            key,
            value,
            updated_at,
            board: BoardRef::default(),
        }
    }

    /// Creates a ranker stamped with the current wall-clock time.
    pub fn now(key: K, value: V) -> Self {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self::new(key, value, updated_at)
    }

    /// Returns true while the board this ranker came from is still alive.
    pub fn is_attached(&self) -> bool {
        self.board.upgrade().is_some()
    }

    /// Returns this ranker's current rank on its board.
    ///
    /// Fails with `DetachedRanker` if the ranker was never added, was removed, or
    /// its board is gone, and with `NotInIndex` if the key has since left the board.
    pub fn rank(&self) -> Result<usize> {
        let board = self.board.upgrade().ok_or(RankError::DetachedRanker)?;
        let core = board.borrow();
        core.index.rank_by_key(&self.key).map_err(RankError::from_query)
    }

    /// Returns this ranker's rank counted from the bottom of its board.
    pub fn reverse_rank(&self) -> Result<usize> {
        let board = self.board.upgrade().ok_or(RankError::DetachedRanker)?;
        let core = board.borrow();
        core.index.reverse_rank_by_key(&self.key).map_err(RankError::from_query)
    }

    pub(crate) fn attach(&mut self, board: &Rc<RefCell<BoardCore<K, V>>>) {
        self.board = BoardRef(Some(Rc::downgrade(board)));
    }

    pub(crate) fn detach(&mut self) {
        self.board = BoardRef::default();
    }
}

impl<K: RankKey, V: Score> Element for Ranker<K, V> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .cmp(&self.value)
            .then_with(|| self.updated_at.cmp(&other.updated_at))
    }
}

impl<K: RankKey, V: Score> PartialEq for Ranker<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value && self.updated_at == other.updated_at
    }
}

impl<K: RankKey, V: Score> Eq for Ranker<K, V> {}

impl<K: RankKey + fmt::Debug, V: Score> fmt::Debug for Ranker<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ranker")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("updated_at", &self.updated_at)
            .field("attached", &self.is_attached())
            .finish()
    }
}

// Non-owning link back to the board holding a ranker.
pub(crate) struct BoardRef<K: RankKey, V: Score>(Option<Weak<RefCell<BoardCore<K, V>>>>);

impl<K: RankKey, V: Score> BoardRef<K, V> {
    fn upgrade(&self) -> Option<Rc<RefCell<BoardCore<K, V>>>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }
}

impl<K: RankKey, V: Score> Default for BoardRef<K, V> {
    fn default() -> Self {
        Self(None)
    }
}

impl<K: RankKey, V: Score> Clone for BoardRef<K, V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
