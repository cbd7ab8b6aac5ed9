//! TOC lookup against the active index snapshot.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Serialize, Serializer};
use tocmatch_core::{embed, Toc};

use crate::error::{Result, SearchError};
use crate::kdtree::SpatialIndex;

/// Neighbours fetched per lookup before the threshold filter.
pub const LOOKUP_FANOUT: usize = 10;

/// A catalog tracklist that matched a TOC.
///
/// Serializes as the two-element array `[id, distance_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocMatch {
    pub id: u64,
    pub distance_ms: u64,
}

impl Serialize for TocMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.id, self.distance_ms).serialize(serializer)
    }
}

/// Find catalog tracklists within `threshold_ms` of the TOC in `raw_toc`.
///
/// Matches are closest first. A valid TOC with nothing under the threshold
/// yields an empty list.
pub fn lookup(index: &SpatialIndex, raw_toc: &str, threshold_ms: u64) -> Result<Vec<TocMatch>> {
    let toc = Toc::parse(raw_toc)?;
    let point = embed(&toc.durations());
    log::debug!("Looking up {toc} at {point}");
    let limit = threshold_ms.saturating_mul(threshold_ms);

    Ok(index
        .query(&point, LOOKUP_FANOUT)
        .into_iter()
        .filter(|hit| hit.squared_distance < limit)
        .map(|hit| TocMatch {
            id: hit.id,
            distance_ms: hit.squared_distance.isqrt(),
        })
        .collect())
}

/// Render matches as `[[id, distance_ms], ...]`.
pub fn format_matches(matches: &[TocMatch]) -> serde_json::Result<String> {
    serde_json::to_string(matches)
}

/// Shared reference to the active index.
///
/// Readers take a snapshot and keep using it even if a rebuild installs a
/// newer index mid-query.
#[derive(Default)]
pub struct IndexHandle {
    current: ArcSwapOption<SpatialIndex>,
}

impl IndexHandle {
    /// A handle with no index installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(index: SpatialIndex) -> Self {
        let handle = Self::new();
        handle.install(index);
        handle
    }

    /// Atomically replace the active index, returning the previous one.
    pub fn install(&self, index: SpatialIndex) -> Option<Arc<SpatialIndex>> {
        log::info!("Installing index snapshot with {} tracklists", index.len());
        self.current.swap(Some(Arc::new(index)))
    }

    /// The active index.
    pub fn snapshot(&self) -> Result<Arc<SpatialIndex>> {
        self.current.load_full().ok_or(SearchError::IndexNotReady)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load_full();
        f.debug_struct("IndexHandle")
            .field("ready", &current.is_some())
            .field("len", &current.as_ref().map(|index| index.len()))
            .finish()
    }
}

/// Answers lookups from whatever index the handle currently holds.
#[derive(Debug, Clone)]
pub struct LookupService {
    handle: Arc<IndexHandle>,
}

impl LookupService {
    #[must_use]
    pub fn new(handle: Arc<IndexHandle>) -> Self {
        Self { handle }
    }

    pub fn lookup(&self, raw_toc: &str, threshold_ms: u64) -> Result<Vec<TocMatch>> {
        let index = self.handle.snapshot()?;
        lookup(&index, raw_toc, threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> SpatialIndex {
        // TOC below has four tracks of 200 s each.
        let exact = embed(&[200_000, 200_000, 200_000, 200_000]);
        let near = embed(&[201_000, 200_000, 199_000, 200_000]);
        let far = embed(&[100_000, 300_000, 250_000, 150_000]);
        let other_length = embed(&[200_000, 200_000, 200_000]);
        SpatialIndex::build(vec![exact, near, far, other_length], vec![10, 20, 30, 40]).unwrap()
    }

    const TOC: &str = "1 4 60150 150 15150 30150 45150";

    #[test]
    fn test_lookup_ranks_by_distance() {
        let matches = lookup(&sample_index(), TOC, 5_000).unwrap();
        assert_eq!(
            matches,
            vec![
                TocMatch {
                    id: 10,
                    distance_ms: 0
                },
                TocMatch {
                    id: 20,
                    distance_ms: 1_414
                },
            ]
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // The near entry sits at 2_000_000, between 1_414^2 and 1_415^2.
        let matches = lookup(&sample_index(), TOC, 1_414).unwrap();
        assert_eq!(matches.len(), 1);

        let matches = lookup(&sample_index(), TOC, 1_415).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_zero_threshold_returns_nothing() {
        let far_toc = "1 4 60150 150 20150 30150 45150";
        let matches = lookup(&sample_index(), far_toc, 0).unwrap();
        assert!(matches.is_empty());
        // Even an exact match is not strictly below zero.
        assert!(lookup(&sample_index(), TOC, 0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_toc_is_rejected() {
        let err = lookup(&sample_index(), "2 4 60150 150 15150 30150 45150", 5_000).unwrap_err();
        assert!(matches!(err, SearchError::InvalidToc(_)));
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_format_matches() {
        let matches = vec![
            TocMatch {
                id: 10,
                distance_ms: 0,
            },
            TocMatch {
                id: 20,
                distance_ms: 1_414,
            },
        ];
        assert_eq!(format_matches(&matches).unwrap(), "[[10,0],[20,1414]]");
        assert_eq!(format_matches(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_service_not_ready() {
        let service = LookupService::new(Arc::new(IndexHandle::new()));
        assert!(matches!(
            service.lookup(TOC, 5_000),
            Err(SearchError::IndexNotReady)
        ));
    }

    #[test]
    fn test_service_uses_installed_index() {
        let handle = Arc::new(IndexHandle::new());
        let service = LookupService::new(Arc::clone(&handle));
        assert!(!handle.is_ready());

        assert!(handle.install(sample_index()).is_none());
        assert!(handle.is_ready());
        assert_eq!(service.lookup(TOC, 5_000).unwrap().len(), 2);
    }

    #[test]
    fn test_swap_keeps_old_snapshot_alive() {
        let handle = IndexHandle::with_index(sample_index());
        let before = handle.snapshot().unwrap();

        let replacement = SpatialIndex::build(vec![embed(&[1, 2, 3, 4])], vec![99]).unwrap();
        let previous = handle.install(replacement).unwrap();

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.len(), 4);
        assert_eq!(handle.snapshot().unwrap().len(), 1);
    }
}
