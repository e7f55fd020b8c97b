use std::cell::{Ref, RefCell, RefMut};
use std::fmt::Debug;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::config::IndexConfig;
use crate::error::{IndexError, RankError, Result};
use crate::index::{LinkedListSkipList, OrderedIndex};
use crate::rank::ranker::Ranker;
use crate::rank::score::{RankKey, Score};

type Index<K, V> = LinkedListSkipList<Ranker<K, V>>;

pub(crate) struct BoardCore<K: RankKey, V: Score> {
    pub(crate) index: Index<K, V>,
    values: FxHashMap<K, V>,
}

impl<K: RankKey, V: Score> BoardCore<K, V> {
    // Whether `key` is on the board, after checking the index and the value table agree.
    fn holds(&self, key: &K) -> Result<bool> {
        match (self.index.contains(key), self.values.contains_key(key)) {
            (true, true) => Ok(true),
            (false, false) => Ok(false),
            _ => Err(inconsistent("index and value table disagree on a key")),
        }
    }

    // Copies an indexed ranker out, checking the value table still agrees with it.
    fn snapshot(&self, ranker: &Ranker<K, V>) -> Result<Ranker<K, V>> {
        match self.values.get(&ranker.key) {
            Some(value) if *value == ranker.value => Ok(ranker.clone()),
            _ => Err(inconsistent("indexed ranker does not match the value table")),
        }
    }
}

/// A leaderboard: rankers ordered by value, addressable by key.
///
/// Mutations relocate the ranker inside the skip list and then update a key to
/// value table, so reading a current value never walks the list. Rankers handed
/// out by the board are snapshots that keep a weak link back to it.
///
/// The board is single-threaded. Callers sharing one across contexts must
/// serialize access to it themselves.
pub struct RankBoard<K: RankKey, V: Score> {
    // Only borrowed for the duration of a single call, never across one.
    core: Rc<RefCell<BoardCore<K, V>>>,
}

impl<K: RankKey, V: Score> RankBoard<K, V> {
    pub fn new() -> Self {
        Self::from_index(LinkedListSkipList::new())
    }

    pub fn with_config(config: IndexConfig) -> Result<Self> {
        Ok(Self::from_index(LinkedListSkipList::with_config(config)?))
    }

    fn from_index(index: Index<K, V>) -> Self {
        Self {
            core: Rc::new(RefCell::new(BoardCore {
                index,
                values: FxHashMap::default(),
            })),
        }
    }

    fn core(&self) -> Ref<'_, BoardCore<K, V>> {
        self.core.borrow()
    }

    fn core_mut(&self) -> RefMut<'_, BoardCore<K, V>> {
        self.core.borrow_mut()
    }

    /// Puts a new ranker on the board.
    pub fn add(&mut self, mut ranker: Ranker<K, V>) -> Result<()> {
        let mut core = self.core_mut();
        if core.holds(&ranker.key)? {
            return Err(RankError::DuplicateKey);
        }
        ranker.attach(&self.core);
        let (key, value) = (ranker.key.clone(), ranker.value);
        core.index.insert(ranker)?;
        core.values.insert(key, value);
        #[cfg(feature = "tracing")]
        tracing::debug!(len = core.values.len(), "ranker added");
        Ok(())
    }

    /// Takes the ranker stored under `key` off the board and returns it detached.
    pub fn remove(&mut self, key: &K) -> Result<Ranker<K, V>> {
        let mut core = self.core_mut();
        if !core.holds(key)? {
            return Err(RankError::NotFound);
        }
        let mut ranker = core.index.delete_by_key(key).map_err(RankError::from_mutation)?;
        core.values.remove(key);
        ranker.detach();
        #[cfg(feature = "tracing")]
        tracing::debug!(len = core.values.len(), "ranker removed");
        Ok(ranker)
    }

    /// Takes `ranker` off the board by its key and detaches the caller's copy.
    pub fn remove_ranker(&mut self, ranker: &mut Ranker<K, V>) -> Result<()> {
        self.remove(&ranker.key)?;
        ranker.detach();
        Ok(())
    }

    /// Replaces the ranker stored under `ranker.key` and moves it to its new rank.
    ///
    /// Fails with `NotFound` if the key is not on the board; use [`add`](Self::add)
    /// for new keys. The replacement counts as a fresh insertion, so among exact
    /// ties it goes last. On failure the board is left exactly as it was.
    pub fn update(&mut self, ranker: Ranker<K, V>) -> Result<()> {
        self.relocate(ranker, |index, ranker| index.insert(ranker))
    }

    // Unlinks the current entry, then lets `reinsert` place the replacement. If that
    // fails the previous entry is linked back at its old position.
    fn relocate<F>(&mut self, mut ranker: Ranker<K, V>, reinsert: F) -> Result<()>
    where
        F: FnOnce(&mut Index<K, V>, Ranker<K, V>) -> Result<(), IndexError>,
    {
        let mut core = self.core_mut();
        let core = &mut *core;
        if !core.holds(&ranker.key)? {
            return Err(RankError::NotFound);
        }
        ranker.attach(&self.core);
        let (key, value) = (ranker.key.clone(), ranker.value);
        let (previous, seq) = core.index.unlink(&key).map_err(RankError::from_mutation)?;
        match reinsert(&mut core.index, ranker) {
            Ok(()) => {
                core.values.insert(key, value);
                #[cfg(feature = "tracing")]
                tracing::debug!(len = core.values.len(), "ranker updated");
                Ok(())
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%error, "update failed, restoring previous ranker");
                core.index
                    .link(previous, seq)
                    .map_err(|_| inconsistent("previous ranker could not be restored"))?;
                Err(RankError::from_mutation(error))
            }
        }
    }

    /// Rank of `key`, 1 being the highest value.
    pub fn rank(&self, key: &K) -> Result<usize> {
        self.core().index.rank_by_key(key).map_err(RankError::from_query)
    }

    /// Rank of `key` counted from the lowest value.
    pub fn reverse_rank(&self, key: &K) -> Result<usize> {
        self.core().index.reverse_rank_by_key(key).map_err(RankError::from_query)
    }

    /// Rankers ranked `start..=end`, best first. `end` past the last rank is clamped.
    pub fn entries_in_rank_range(&self, start: usize, end: usize) -> Result<Vec<Ranker<K, V>>> {
        let core = self.core();
        let rankers = core.index.range_by_rank(start, end)?;
        rankers.into_iter().map(|ranker| core.snapshot(ranker)).collect()
    }

    pub fn entry_at_rank(&self, rank: usize) -> Result<Ranker<K, V>> {
        let core = self.core();
        let ranker = core.index.element_by_rank(rank)?;
        core.snapshot(ranker)
    }

    /// Current value of `key`, read from the value table without resolving rank.
    pub fn entry_by_key(&self, key: &K) -> Result<V> {
        self.core().values.get(key).copied().ok_or(RankError::NotFound)
    }

    /// Full snapshot of the ranker stored under `key`.
    pub fn ranker(&self, key: &K) -> Result<Ranker<K, V>> {
        let core = self.core();
        let ranker = core.index.get(key).ok_or(RankError::NotFound)?;
        core.snapshot(ranker)
    }

    /// Every ranker, best first.
    pub fn all_entries(&self) -> Result<Vec<Ranker<K, V>>> {
        match self.len() {
            0 => Ok(Vec::new()),
            len => self.entries_in_rank_range(1, len),
        }
    }

    /// The best `n` rankers, or all of them if there are fewer.
    pub fn top(&self, n: usize) -> Result<Vec<Ranker<K, V>>> {
        match n {
            0 => Ok(Vec::new()),
            n => self.entries_in_rank_range(1, n),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.core().values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.core().index.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every ranker. Snapshots handed out earlier stay attached but
    /// report `NotInIndex`.
    pub fn clear(&mut self) {
        let mut core = self.core_mut();
        core.index.clear();
        core.values.clear();
    }
}

impl<K: RankKey + Debug, V: Score> RankBoard<K, V> {
    /// Renders the board for inspection. Not a stable format.
    pub fn dump(&self) -> String {
        self.core().index.dump()
    }
}

impl<K: RankKey, V: Score> Default for RankBoard<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RankKey + Debug, V: Score> Debug for RankBoard<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankBoard")
            .field("rankers", &self.core().index)
            .finish()
    }
}

fn inconsistent(what: &'static str) -> RankError {
    #[cfg(feature = "tracing")]
    tracing::error!(what, "rank board failed a consistency check");
    RankError::InternalInconsistency(what)
}
