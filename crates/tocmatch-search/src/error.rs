use thiserror::Error;
use tocmatch_core::TocError;

/// Errors from building or querying the index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The TOC failed to parse or validate.
    #[error("invalid TOC: {0}")]
    InvalidToc(#[from] TocError),

    /// No points were supplied to build from.
    #[error("cannot build an index from an empty batch")]
    EmptyBatch,

    /// No index has been installed yet.
    #[error("index is not ready")]
    IndexNotReady,

    /// Points and ids were supplied in different numbers.
    #[error("{points} points supplied with {ids} ids")]
    LengthMismatch { points: usize, ids: usize },

    /// The same external id was supplied twice.
    #[error("duplicate external id {0}")]
    DuplicateId(u64),
}

impl SearchError {
    /// Returns `true` when the caller sent a bad request rather than the
    /// service being unable to answer.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidToc(_))
    }
}

/// Convenience alias for search results.
pub type Result<T> = std::result::Result<T, SearchError>;
