//! In-memory leaderboards backed by a span-augmented skip list.
//!
//! [`LinkedListSkipList`] keeps uniquely keyed elements in a total order and
//! answers key to rank, rank to element and rank range queries in expected
//! O(log n). [`RankBoard`] layers leaderboard semantics on top: [`Ranker`]s sort
//! by value descending, ties going to whoever reached the value first.
//!
//! ```
//! use rankboard::{RankBoard, Ranker};
//!
//! let mut board = RankBoard::new();
//! board.add(Ranker::new("alice", 120_u32, 1)).unwrap();
//! board.add(Ranker::new("bob", 95, 2)).unwrap();
//! board.add(Ranker::new("carol", 120, 3)).unwrap();
//!
//! assert_eq!(board.rank(&"carol"), Ok(2));
//!
//! board.update(Ranker::new("bob", 130, 4)).unwrap();
//! let top: Vec<_> = board.top(2).unwrap().into_iter().map(|r| r.key).collect();
//! assert_eq!(top, ["bob", "alice"]);
//!
//! // Snapshots know where they came from.
//! let carol = board.entry_at_rank(3).unwrap();
//! assert_eq!(carol.rank(), Ok(3));
//! ```

mod config;
mod error;
mod index;
mod rank;

pub use config::IndexConfig;
pub use error::{IndexError, RankError, Result};
pub use index::{Element, Iter, LinkedListSkipList, OrderedIndex, DEFAULT_MAX_HEIGHT};
pub use rank::{RankBoard, RankKey, Ranker, Score};
