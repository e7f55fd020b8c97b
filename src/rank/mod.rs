mod board;
mod ranker;
mod score;

pub use board::RankBoard;
pub use ranker::Ranker;
pub use score::{RankKey, Score};
