use std::fmt::Debug;
use std::hash::Hash;

/// Totally ordered numeric value a ranker is scored by.
pub trait Score: Ord + Copy + Debug {}

macro_rules! impl_score {
    ($($t:ty),* $(,)?) => {
        $(impl Score for $t {})*
    };
}

impl_score!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Identity of a ranker on a board.
pub trait RankKey: Eq + Hash + Clone {}

impl<T: Eq + Hash + Clone> RankKey for T {}
