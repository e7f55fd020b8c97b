use thiserror::Error;

/// Failures reported by the ordered index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("an element with the same key is already indexed")]
    DuplicateKey,

    #[error("no element with the given key is indexed")]
    NotFound,

    #[error("rank range {start}..={end} is invalid for an index of {len} elements")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    /// The linkage disagrees with the key table. Indicates a bug, not a caller error.
    #[error("index corrupted: {0}")]
    Corrupted(&'static str),
}

/// Failures reported by a [`RankBoard`](crate::RankBoard) and its rankers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("a ranker with the same key is already on the board")]
    DuplicateKey,

    #[error("no ranker with the given key is on the board")]
    NotFound,

    #[error("the ranker is not in the index")]
    NotInIndex,

    #[error("rank range {start}..={end} is invalid for a board of {len} rankers")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("the ranker is not attached to a live board")]
    DetachedRanker,

    #[error("invalid board configuration: {0}")]
    InvalidConfig(String),

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(&'static str),
}

impl RankError {
    /// Maps an index failure raised by a mutation (`remove`, `update`).
    pub(crate) fn from_mutation(error: IndexError) -> Self {
        match error {
            IndexError::NotFound => RankError::NotFound,
            other => other.into(),
        }
    }

    /// Maps an index failure raised by a rank query.
    pub(crate) fn from_query(error: IndexError) -> Self {
        match error {
            IndexError::NotFound => RankError::NotInIndex,
            other => other.into(),
        }
    }
}

impl From<IndexError> for RankError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::DuplicateKey => RankError::DuplicateKey,
            IndexError::NotFound => RankError::NotFound,
            IndexError::OutOfRange { start, end, len } => RankError::OutOfRange { start, end, len },
            IndexError::InvalidConfig(reason) => RankError::InvalidConfig(reason),
            IndexError::Corrupted(what) => {
                #[cfg(feature = "tracing")]
                tracing::error!(what, "ordered index failed a consistency check");
                RankError::InternalInconsistency(what)
            }
        }
    }
}

pub type Result<T, E = RankError> = std::result::Result<T, E>;
