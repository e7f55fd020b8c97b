mod linkedlist_skiplist;
mod skiplist;

pub use linkedlist_skiplist::{Iter, LinkedListSkipList, DEFAULT_MAX_HEIGHT};
pub use skiplist::{Element, OrderedIndex};
