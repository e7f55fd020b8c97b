use std::cmp::Ordering;

use proptest::prelude::*;
use rankboard::{Element, IndexConfig, LinkedListSkipList, OrderedIndex, RankBoard, RankError, Ranker};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 400;

fn key_strategy() -> impl Strategy<Value = u16> {
    // Small enough to make duplicate adds and hits on removes common.
    0u16..64
}

fn value_strategy() -> impl Strategy<Value = i32> {
    // Narrow so equal values, and therefore timestamp tie-breaks, show up.
    -8i32..8
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum BoardOp {
    Add(u16, i32),
    Update(u16, i32),
    Remove(u16),
    Rank(u16),
    Range(usize, usize),
    AtRank(usize),
}

fn board_op_strategy() -> impl Strategy<Value = BoardOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy()).prop_map(|(k, v)| BoardOp::Add(k, v)),
        3 => (key_strategy(), value_strategy()).prop_map(|(k, v)| BoardOp::Update(k, v)),
        2 => key_strategy().prop_map(BoardOp::Remove),
        2 => key_strategy().prop_map(BoardOp::Rank),
        1 => (0usize..70, 0usize..70).prop_map(|(s, e)| BoardOp::Range(s, e)),
        1 => (0usize..70).prop_map(BoardOp::AtRank),
    ]
}

/// Reference model: a vector kept sorted by the leaderboard order.
#[derive(Default)]
struct Model {
    entries: Vec<(u16, i32, i64)>,
}

impl Model {
    fn position(&self, key: u16) -> Option<usize> {
        self.entries.iter().position(|entry| entry.0 == key)
    }

    fn insert(&mut self, key: u16, value: i32, at: i64) {
        self.entries.push((key, value, at));
        self.entries
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
    }

    fn range(&self, start: usize, end: usize) -> Result<Vec<u16>, ()> {
        if start == 0 || start > end {
            return Err(());
        }
        Ok(self.entries.iter().skip(start - 1).take(end - start + 1).map(|entry| entry.0).collect())
    }
}

fn keys(rankers: Vec<Ranker<u16, i32>>) -> Vec<u16> {
    rankers.into_iter().map(|ranker| ranker.key).collect()
}

// ─── Board against model ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Replays random operations on a board and the sorted-vector model and
    /// asserts identical results at every step.
    #[test]
    fn board_ops_match_model(ops in proptest::collection::vec(board_op_strategy(), TEST_SIZE), seed in any::<u64>()) {
        let mut board: RankBoard<u16, i32> = RankBoard::with_config(IndexConfig::default().with_seed(seed)).unwrap();
        let mut model = Model::default();
        // Strictly increasing, so every ranker has a distinct update time.
        let mut clock = 0_i64;

        for op in ops {
            clock += 1;
            match op {
                BoardOp::Add(key, value) => {
                    let result = board.add(Ranker::new(key, value, clock));
                    if model.position(key).is_some() {
                        prop_assert_eq!(result, Err(RankError::DuplicateKey));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.insert(key, value, clock);
                    }
                }
                BoardOp::Update(key, value) => {
                    let result = board.update(Ranker::new(key, value, clock));
                    match model.position(key) {
                        Some(index) => {
                            prop_assert_eq!(result, Ok(()));
                            model.entries.remove(index);
                            model.insert(key, value, clock);
                        }
                        None => prop_assert_eq!(result, Err(RankError::NotFound)),
                    }
                }
                BoardOp::Remove(key) => {
                    let result = board.remove(&key).map(|ranker| ranker.key);
                    match model.position(key) {
                        Some(index) => {
                            model.entries.remove(index);
                            prop_assert_eq!(result, Ok(key));
                        }
                        None => prop_assert_eq!(result, Err(RankError::NotFound)),
                    }
                }
                BoardOp::Rank(key) => {
                    let expected = model.position(key).map(|index| index + 1).ok_or(RankError::NotInIndex);
                    prop_assert_eq!(board.rank(&key), expected.clone());
                    prop_assert_eq!(
                        board.reverse_rank(&key),
                        expected.map(|rank| model.entries.len() - rank + 1)
                    );
                }
                BoardOp::Range(start, end) => {
                    match model.range(start, end) {
                        Ok(expected) => prop_assert_eq!(keys(board.entries_in_rank_range(start, end).unwrap()), expected),
                        Err(()) => prop_assert!(
                            matches!(board.entries_in_rank_range(start, end), Err(RankError::OutOfRange { .. })),
                            "range {}..={} should be out of range", start, end
                        ),
                    }
                }
                BoardOp::AtRank(rank) => {
                    let result = board.entry_at_rank(rank).map(|ranker| ranker.key);
                    match model.entries.get(rank.wrapping_sub(1)) {
                        Some(entry) if rank > 0 => prop_assert_eq!(result, Ok(entry.0)),
                        _ => prop_assert!(
                            matches!(result, Err(RankError::OutOfRange { .. })),
                            "rank {} should be out of range", rank
                        ),
                    }
                }
            }
            prop_assert_eq!(board.len(), model.entries.len());
        }

        let all = board.all_entries().unwrap();
        let expected: Vec<u16> = model.entries.iter().map(|entry| entry.0).collect();
        prop_assert_eq!(keys(all.clone()), expected);
        for entry in &model.entries {
            prop_assert_eq!(board.entry_by_key(&entry.0), Ok(entry.1));
        }
        for pair in all.windows(2) {
            prop_assert!(
                pair[0].value > pair[1].value
                    || (pair[0].value == pair[1].value && pair[0].updated_at <= pair[1].updated_at),
                "rankers {} and {} are out of order", pair[0].key, pair[1].key
            );
        }
    }
}

// ─── Index laws ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Score {
    id: u32,
    points: u8,
}

impl Element for Score {
    type Key = u32;

    fn key(&self) -> &u32 {
        &self.id
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        other.points.cmp(&self.points)
    }
}

fn filled(points: &[u8], seed: u64) -> LinkedListSkipList<Score> {
    let mut list = LinkedListSkipList::with_config(IndexConfig::default().with_seed(seed)).unwrap();
    for (id, points) in points.iter().enumerate() {
        list.insert(Score { id: id as u32, points: *points }).unwrap();
    }
    list
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rank_and_element_are_dual(points in proptest::collection::vec(any::<u8>(), 1..300), seed in any::<u64>()) {
        let list = filled(&points, seed);
        for rank in 1..=list.count() {
            let key = *list.element_by_rank(rank).unwrap().key();
            prop_assert_eq!(list.rank_by_key(&key), Ok(rank));
            prop_assert_eq!(list.reverse_rank_by_key(&key), Ok(list.count() - rank + 1));
        }
    }

    #[test]
    fn insert_then_delete_is_identity(
        points in proptest::collection::vec(any::<u8>(), 0..200),
        extra in any::<u8>(),
        seed in any::<u64>(),
    ) {
        let mut list = filled(&points, seed);
        let ranks = |list: &LinkedListSkipList<Score>| -> Vec<usize> {
            (0..points.len() as u32).map(|id| list.rank_by_key(&id).unwrap()).collect()
        };
        let before = ranks(&list);
        list.insert(Score { id: u32::MAX, points: extra }).unwrap();
        prop_assert_eq!(list.delete_by_key(&u32::MAX), Ok(Score { id: u32::MAX, points: extra }));
        prop_assert_eq!(list.count(), points.len());
        prop_assert_eq!(ranks(&list), before);
    }

    #[test]
    fn range_matches_iteration(
        points in proptest::collection::vec(any::<u8>(), 0..200),
        start in 1usize..250,
        len in 0usize..250,
        seed in any::<u64>(),
    ) {
        let list = filled(&points, seed);
        let end = start + len;
        let range: Vec<u32> = list.range_by_rank(start, end).unwrap().into_iter().map(|s| s.id).collect();
        let expected: Vec<u32> = list.iter().skip(start - 1).take(len + 1).map(|s| s.id).collect();
        prop_assert_eq!(range, expected);
    }
}
