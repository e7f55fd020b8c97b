use std::cmp::{max, min, Ordering};
use std::fmt::{self, Debug, Write};
use std::marker::PhantomData;
use std::ptr::NonNull;

use rustc_hash::FxHashMap;

use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::index::skiplist::{Element, OrderedIndex};

pub const DEFAULT_MAX_HEIGHT: usize = 32;

/// Skip list whose forward links carry spans, so every positional query is
/// answered by a single top-down walk.
///
/// Besides the links, a key table maps each key straight to its node. Deleting or
/// ranking by key reads the node's element from the table and then searches for it
/// by order, which is what keeps the structure ordered by score but addressable
/// by identity.
pub struct LinkedListSkipList<E: Element, const MAX_HEIGHT: usize = DEFAULT_MAX_HEIGHT> {
    head: [Level<E>; MAX_HEIGHT],
    current_height: usize,
    current_size: usize,
    next_seq: u64,
    nodes: FxHashMap<E::Key, NonNull<Node<E>>>,
    rng: fastrand::Rng,
    probability: f64,
    _marker: PhantomData<Box<Node<E>>>,
}

// SAFETY: every node is uniquely owned by the list and only reachable through it,
// so moving the list moves exclusive ownership of all nodes.
unsafe impl<E: Element + Send, const MAX_HEIGHT: usize> Send for LinkedListSkipList<E, MAX_HEIGHT> where
    E::Key: Send
{
}

// SAFETY: shared access never mutates nodes.
unsafe impl<E: Element + Sync, const MAX_HEIGHT: usize> Sync for LinkedListSkipList<E, MAX_HEIGHT> where
    E::Key: Sync
{
}

impl<E: Element, const MAX_HEIGHT: usize> LinkedListSkipList<E, MAX_HEIGHT> {
    pub fn new() -> Self {
        Self::build(IndexConfig::default())
    }

    pub fn with_config(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        if MAX_HEIGHT == 0 {
            return Err(IndexError::InvalidConfig("MAX_HEIGHT must be at least 1".to_owned()));
        }
        Ok(Self::build(config))
    }

    fn build(config: IndexConfig) -> Self {
        assert!(MAX_HEIGHT > 0, "`LinkedListSkipList` - `MAX_HEIGHT` must be at least 1!");
        Self {
            head: std::array::from_fn(|_| Level::EMPTY),
            current_height: 0,
            current_size: 0,
            next_seq: 0,
            nodes: FxHashMap::default(),
            rng: config.rng(),
            probability: config.probability,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current_size == 0
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.current_height
    }

    /// Iterates elements in ascending rank order.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            next: self.head[0].next,
            remaining: self.current_size,
            _marker: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        self.free_nodes();
        self.head = std::array::from_fn(|_| Level::EMPTY);
        self.current_height = 0;
        self.current_size = 0;
        self.nodes.clear();
    }

    // Levels of the node at `at`; `None` is the head sentinel.
    #[inline(always)]
    fn level(&self, at: Link<E>, level: usize) -> Level<E> {
        match at {
            None => self.head[level],
            Some(node) => {
                // SAFETY: linked nodes stay allocated until freed by `unlink`.
                let node = unsafe { &*node.as_ptr() };
                node.levels[level]
            }
        }
    }

    #[inline(always)]
    fn level_mut(&mut self, at: Link<E>, level: usize) -> &mut Level<E> {
        match at {
            None => &mut self.head[level],
            Some(node) => {
                // SAFETY: as above, and `&mut self` guarantees exclusive access.
                let node = unsafe { &mut *node.as_ptr() };
                &mut node.levels[level]
            }
        }
    }

    // For each level, the last node sorting before (element, seq) and its rank.
    fn find_predecessors(&self, element: &E, seq: u64) -> ([Link<E>; MAX_HEIGHT], [usize; MAX_HEIGHT]) {
        let mut previous: [Link<E>; MAX_HEIGHT] = [None; MAX_HEIGHT];
        let mut ranks = [0_usize; MAX_HEIGHT];
        let mut current: Link<E> = None;
        let mut traversed = 0;
        for level in (0..self.current_height).rev() {
            loop {
                let link = self.level(current, level);
                match link.next {
                    // SAFETY: see `level`.
                    Some(next) if unsafe { next.as_ref() }.sorts_before(element, seq) => {
                        traversed += link.span;
                        current = Some(next);
                    }
                    _ => break,
                }
            }
            previous[level] = current;
            ranks[level] = traversed;
        }
        (previous, ranks)
    }

    fn node_by_rank(&self, rank: usize) -> Link<E> {
        let mut current: Link<E> = None;
        let mut traversed = 0;
        for level in (0..self.current_height).rev() {
            loop {
                let link = self.level(current, level);
                match link.next {
                    Some(next) if traversed + link.span <= rank => {
                        traversed += link.span;
                        current = Some(next);
                    }
                    _ => break,
                }
            }
            if traversed == rank {
                return current;
            }
        }
        None
    }

    #[inline(always)]
    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < MAX_HEIGHT && self.rng.f64() < self.probability {
            height += 1
        }
        height
    }

    fn free_nodes(&mut self) {
        let mut current_node = self.head[0].next;
        while let Some(node) = current_node {
            // SAFETY: each node was leaked from a `Box` on insert and is freed exactly once.
            let node = unsafe { Box::from_raw(node.as_ptr()) };
            current_node = node.levels[0].next;
        }
    }
}

impl<E, const MAX_HEIGHT: usize> LinkedListSkipList<E, MAX_HEIGHT>
where
    E: Element + Debug,
    E::Key: Debug,
{
    /// Renders every level's links and spans followed by the elements with their ranks.
    /// Diagnostic only; the format is not stable.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for level in (0..self.current_height).rev() {
            let _ = write!(out, "L{level}: head");
            let mut current: Link<E> = None;
            loop {
                let link = self.level(current, level);
                match link.next {
                    Some(node) => {
                        // SAFETY: see `level`.
                        let _ = write!(out, " -{}-> {:?}", link.span, unsafe { node.as_ref() }.element.key());
                        current = Some(node);
                    }
                    None => {
                        let _ = writeln!(out, " -> None");
                        break;
                    }
                }
            }
        }
        for (rank, element) in self.iter().enumerate() {
            let _ = writeln!(out, "#{} {:?} {:?}", rank + 1, element.key(), element);
        }
        out
    }
}

impl<E: Element, const MAX_HEIGHT: usize> LinkedListSkipList<E, MAX_HEIGHT> {
    // Splices `element` in at the position given by its order and `seq`.
    pub(crate) fn link(&mut self, element: E, seq: u64) -> Result<(), IndexError> {
        if self.nodes.contains_key(element.key()) {
            return Err(IndexError::DuplicateKey);
        }
        let (previous, ranks) = self.find_predecessors(&element, seq);
        let height = self.random_height();
        for level in self.current_height..height {
            // Unused levels hang off the head and span the whole list.
            self.head[level].span = self.current_size;
        }
        self.current_height = max(self.current_height, height);

        let key = element.key().clone();
        let node = Node::new_link(element, seq, height);
        for level in 0..height {
            let link = self.level(previous[level], level);
            let distance = ranks[0] - ranks[level];
            // SAFETY: `node` was just allocated and is not yet shared.
            let fresh = unsafe { &mut *node.as_ptr() };
            fresh.levels[level] = Level {
                next: link.next,
                span: link.span - distance,
            };
            *self.level_mut(previous[level], level) = Level {
                next: Some(node),
                span: distance + 1,
            };
        }
        for level in height..self.current_height {
            self.level_mut(previous[level], level).span += 1;
        }

        self.nodes.insert(key, node);
        self.current_size += 1;
        #[cfg(feature = "tracing")]
        tracing::trace!(height, rank = ranks[0] + 1, len = self.current_size, "skiplist insert");
        Ok(())
    }

    // Removes the element under `key`, handing back its insertion sequence so
    // `link` can put it back in exactly the same place.
    pub(crate) fn unlink(&mut self, key: &E::Key) -> Result<(E, u64), IndexError> {
        let node = *self.nodes.get(key).ok_or(IndexError::NotFound)?;
        // SAFETY: nodes in the key table are linked and allocated.
        let target = unsafe { node.as_ref() };
        let (previous, _) = self.find_predecessors(&target.element, target.seq);
        if self.level(previous[0], 0).next != Some(node) {
            return Err(IndexError::Corrupted("key table points at an unlinked node"));
        }

        for level in 0..self.current_height {
            let link = self.level_mut(previous[level], level);
            if link.next == Some(node) {
                // SAFETY: `node` is still allocated; only its predecessors are rewritten here.
                let skipped = unsafe { &*node.as_ptr() }.levels[level];
                link.span = link.span + skipped.span - 1;
                link.next = skipped.next;
            } else {
                link.span -= 1;
            }
        }
        while self.current_height > 0 && self.head[self.current_height - 1].next.is_none() {
            self.head[self.current_height - 1].span = 0;
            self.current_height -= 1;
        }

        self.nodes.remove(key);
        self.current_size -= 1;
        // SAFETY: the node is unlinked from every level and from the key table.
        let node = unsafe { Box::from_raw(node.as_ptr()) };
        #[cfg(feature = "tracing")]
        tracing::trace!(len = self.current_size, "skiplist delete");
        Ok((node.element, node.seq))
    }
}

impl<E: Element, const MAX_HEIGHT: usize> OrderedIndex<E> for LinkedListSkipList<E, MAX_HEIGHT> {
    fn insert(&mut self, element: E) -> Result<(), IndexError> {
        if self.nodes.contains_key(element.key()) {
            return Err(IndexError::DuplicateKey);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.link(element, seq)
    }

    fn delete_by_key(&mut self, key: &E::Key) -> Result<E, IndexError> {
        self.unlink(key).map(|(element, _)| element)
    }

    fn get(&self, key: &E::Key) -> Option<&E> {
        // SAFETY: nodes in the key table are allocated for as long as `self` is borrowed.
        self.nodes.get(key).map(|node| unsafe { &(*node.as_ptr()).element })
    }

    fn rank_by_key(&self, key: &E::Key) -> Result<usize, IndexError> {
        let node = *self.nodes.get(key).ok_or(IndexError::NotFound)?;
        // SAFETY: see `unlink`.
        let target = unsafe { node.as_ref() };
        let mut current: Link<E> = None;
        let mut rank = 0;
        for level in (0..self.current_height).rev() {
            loop {
                let link = self.level(current, level);
                match link.next {
                    // SAFETY: see `level`.
                    Some(next)
                        if next == node || unsafe { next.as_ref() }.sorts_before(&target.element, target.seq) =>
                    {
                        rank += link.span;
                        current = Some(next);
                    }
                    _ => break,
                }
            }
            if current == Some(node) {
                return Ok(rank);
            }
        }
        Err(IndexError::Corrupted("key table points at an unreachable node"))
    }

    fn element_by_rank(&self, rank: usize) -> Result<&E, IndexError> {
        if rank == 0 || rank > self.current_size {
            return Err(IndexError::OutOfRange {
                start: rank,
                end: rank,
                len: self.current_size,
            });
        }
        let node = self
            .node_by_rank(rank)
            .ok_or(IndexError::Corrupted("spans do not add up to the element count"))?;
        // SAFETY: see `get`.
        Ok(unsafe { &(*node.as_ptr()).element })
    }

    fn range_by_rank(&self, start: usize, end: usize) -> Result<Vec<&E>, IndexError> {
        if start == 0 || start > end {
            return Err(IndexError::OutOfRange {
                start,
                end,
                len: self.current_size,
            });
        }
        if start > self.current_size {
            return Ok(Vec::new());
        }
        let end = min(end, self.current_size);
        let wanted = end - start + 1;
        let mut cursor = self.node_by_rank(start);
        let mut out = Vec::with_capacity(wanted);
        while out.len() < wanted {
            let node = cursor.ok_or(IndexError::Corrupted("level 0 ends before the element count"))?;
            // SAFETY: see `get`.
            let node = unsafe { &*node.as_ptr() };
            out.push(&node.element);
            cursor = node.levels[0].next;
        }
        Ok(out)
    }

    #[inline]
    fn count(&self) -> usize {
        self.current_size
    }
}

impl<E: Element, const MAX_HEIGHT: usize> Default for LinkedListSkipList<E, MAX_HEIGHT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element + Debug, const MAX_HEIGHT: usize> Debug for LinkedListSkipList<E, MAX_HEIGHT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<E: Element, const MAX_HEIGHT: usize> Drop for LinkedListSkipList<E, MAX_HEIGHT> {
    fn drop(&mut self) {
        self.free_nodes();
    }
}

impl<'a, E: Element, const MAX_HEIGHT: usize> IntoIterator for &'a LinkedListSkipList<E, MAX_HEIGHT> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, E> {
    next: Link<E>,
    remaining: usize,
    _marker: PhantomData<&'a E>,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // SAFETY: the iterator borrows the list, so no node is freed while it lives.
        let node = unsafe { &*node.as_ptr() };
        self.next = node.levels[0].next;
        self.remaining -= 1;
        Some(&node.element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

struct Level<E> {
    next: Link<E>,
    span: usize,
}

impl<E> Level<E> {
    const EMPTY: Self = Self { next: None, span: 0 };
}

impl<E> Clone for Level<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Level<E> {}

struct Node<E> {
    element: E,
    // Insertion order, the final tie-break between elements that compare equal.
    seq: u64,
    levels: Vec<Level<E>>,
}

type Link<E> = Option<NonNull<Node<E>>>;

impl<E: Element> Node<E> {
    fn new_link(element: E, seq: u64, height: usize) -> NonNull<Node<E>> {
        NonNull::from(Box::leak(Box::new(Node {
            element,
            seq,
            levels: vec![Level::EMPTY; height],
        })))
    }

    #[inline(always)]
    fn sorts_before(&self, element: &E, seq: u64) -> bool {
        match self.element.rank_cmp(element) {
            Ordering::Less => true,
            Ordering::Equal => self.seq < seq,
            Ordering::Greater => false,
        }
    }
}

#[cfg(test)]
impl<E: Element, const MAX_HEIGHT: usize> LinkedListSkipList<E, MAX_HEIGHT> {
    /// Walks every level and checks order, spans, nesting and the key table.
    fn assert_invariants(&self) {
        let mut positions: FxHashMap<*const Node<E>, usize> = FxHashMap::default();
        let mut previous: Option<&Node<E>> = None;
        let mut cursor = self.head[0].next;
        let mut rank = 0;
        while let Some(node) = cursor {
            rank += 1;
            // SAFETY: every node reachable on level 0 is allocated.
            let current = unsafe { node.as_ref() };
            if let Some(previous) = previous {
                assert!(previous.sorts_before(&current.element, current.seq), "rank {rank} out of order");
            }
            assert_eq!(self.nodes.get(current.element.key()), Some(&node));
            assert!(!current.levels.is_empty() && current.levels.len() <= self.current_height);
            positions.insert(node.as_ptr() as *const Node<E>, rank);
            previous = Some(current);
            cursor = current.levels[0].next;
        }
        assert_eq!(rank, self.current_size);
        assert_eq!(self.nodes.len(), self.current_size);

        for level in 0..self.current_height {
            let mut position = 0;
            let mut reached = 0;
            let mut current: Link<E> = None;
            loop {
                let link = self.level(current, level);
                match link.next {
                    Some(node) => {
                        let next_position = positions[&(node.as_ptr() as *const Node<E>)];
                        assert_eq!(position + link.span, next_position, "span at level {level}");
                        position = next_position;
                        reached += 1;
                        current = Some(node);
                    }
                    None => {
                        assert_eq!(link.span, self.current_size - position, "tail span at level {level}");
                        break;
                    }
                }
            }
            let tall_enough = positions
                .keys()
                // SAFETY: the keys were collected from live nodes above.
                .filter(|node| unsafe { &***node }.levels.len() > level)
                .count();
            assert_eq!(reached, tall_enough, "level {level} is not a nested subset");
            assert!(reached > 0, "level {level} is empty but below the current height");
        }
        for level in self.current_height..MAX_HEIGHT {
            assert!(self.head[level].next.is_none());
        }
    }
}
