//! Index build error types.

use thiserror::Error;
use tocmatch_search::SearchError;

/// Errors that abort an index build.
///
/// None of these touch an index that is already serving.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The catalog could not be opened or failed mid-stream.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// The catalog delivered rows outside `(tracklist_id, position)` order.
    #[error(
        "catalog row (tracklist {tracklist_id}, position {position}) arrived after \
         (tracklist {after_id}, position {after_position})"
    )]
    Unordered {
        tracklist_id: u64,
        position: u32,
        after_id: u64,
        after_position: u32,
    },

    /// The index itself could not be built, e.g. no tracklist survived
    /// filtering.
    #[error(transparent)]
    Index(#[from] SearchError),
}

impl BuildError {
    /// Returns `true` when the build failed because nothing was left to
    /// index.
    pub fn is_empty_batch(&self) -> bool {
        matches!(self, Self::Index(SearchError::EmptyBatch))
    }
}

impl From<tocmatch_core::Error> for BuildError {
    fn from(error: tocmatch_core::Error) -> Self {
        Self::SourceUnavailable(error.to_string())
    }
}

/// Convenience alias for build results.
pub type BuildResult<T> = std::result::Result<T, BuildError>;
