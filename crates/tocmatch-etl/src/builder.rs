//! Index building from a stream of catalog rows.
//!
//! Rows arrive in pages, ordered by `(tracklist_id, position)`. A
//! [`TracklistGrouper`] folds them back into whole tracklists, carrying the
//! unfinished one across page boundaries. [`IndexBuilder`] filters the
//! tracklists, embeds the survivors, and builds the k-d tree.

use std::time::{Duration, Instant};

use tocmatch_core::schema::Database;
use tocmatch_core::{embed, Point, TrackRow, Tracklist};
use tocmatch_search::SpatialIndex;

use crate::error::{BuildError, BuildResult};

/// Tracklists with fewer tracks than this are not indexed.
pub const MIN_NUMBER_OF_TRACKS: usize = 4;

/// Reassembles tracklists from ordered rows.
#[derive(Debug, Default)]
pub struct TracklistGrouper {
    current: Option<Tracklist>,
    last_position: u32,
}

impl TracklistGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one row. Returns the previous tracklist once a row for a new
    /// tracklist shows up.
    pub fn push(&mut self, row: TrackRow) -> BuildResult<Option<Tracklist>> {
        if let Some(current) = self.current.as_mut() {
            let unordered = BuildError::Unordered {
                tracklist_id: row.tracklist_id,
                position: row.position,
                after_id: current.id,
                after_position: self.last_position,
            };

            if row.tracklist_id == current.id {
                if row.position <= self.last_position {
                    return Err(unordered);
                }
                current.durations.push(row.duration_ms);
                self.last_position = row.position;
                return Ok(None);
            }
            if row.tracklist_id < current.id {
                return Err(unordered);
            }
        }

        self.last_position = row.position;
        Ok(self.current.replace(Tracklist {
            id: row.tracklist_id,
            durations: vec![row.duration_ms],
        }))
    }

    /// The tracklist still being assembled, if any.
    pub fn finish(self) -> Option<Tracklist> {
        self.current
    }
}

/// Counters from one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub chunks: usize,
    pub rows: usize,
    pub tracklists: usize,
    pub indexed: usize,
    pub dropped_missing_duration: usize,
    pub dropped_too_short: usize,
    pub elapsed: Duration,
}

impl BuildStats {
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped_missing_duration + self.dropped_too_short
    }
}

/// A freshly built index and how it was made.
#[derive(Debug)]
pub struct BuiltIndex {
    pub index: SpatialIndex,
    pub stats: BuildStats,
}

enum Verdict {
    Keep(Vec<u64>),
    MissingDuration,
    TooShort,
}

/// Builds a [`SpatialIndex`] from catalog rows.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    min_tracks: usize,
    expected_tracklists: Option<u64>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_tracks: MIN_NUMBER_OF_TRACKS,
            expected_tracklists: None,
        }
    }

    /// Tracklist total used for progress reporting only. It may overcount,
    /// since dropped tracklists are included.
    #[must_use]
    pub fn with_expected_tracklists(mut self, expected: u64) -> Self {
        self.expected_tracklists = Some(expected);
        self
    }

    /// Stream every row out of `db` in pages of `chunk_size` and build.
    pub fn build_from_database(&self, db: &Database, chunk_size: usize) -> BuildResult<BuiltIndex> {
        let expected = db.count_tracklists()?;
        log::info!(
            "Building index from {} catalog tracklists ({} rows per chunk)",
            expected,
            chunk_size
        );
        self.clone()
            .with_expected_tracklists(expected)
            .build_from_source(db.track_chunks(chunk_size))
    }

    /// Consume a finite sequence of row pages and build.
    ///
    /// The first failing page aborts the build.
    pub fn build_from_source<I, E>(&self, chunks: I) -> BuildResult<BuiltIndex>
    where
        I: IntoIterator<Item = Result<Vec<TrackRow>, E>>,
        E: Into<BuildError>,
    {
        let started = Instant::now();
        let mut stats = BuildStats::default();
        let mut points: Vec<Point> = Vec::new();
        let mut ids: Vec<u64> = Vec::new();
        let mut grouper = TracklistGrouper::new();

        for chunk in chunks {
            let rows = chunk.map_err(Into::into)?;
            stats.chunks += 1;
            stats.rows += rows.len();

            for row in rows {
                if let Some(tracklist) = grouper.push(row)? {
                    self.accept(tracklist, &mut points, &mut ids, &mut stats);
                }
            }

            self.report_progress(&stats);
        }

        if let Some(tracklist) = grouper.finish() {
            self.accept(tracklist, &mut points, &mut ids, &mut stats);
        }

        points.shrink_to_fit();
        ids.shrink_to_fit();

        log::info!(
            "Indexed {} of {} tracklists ({} missing a duration, {} with fewer than {} tracks)",
            stats.indexed,
            stats.tracklists,
            stats.dropped_missing_duration,
            stats.dropped_too_short,
            self.min_tracks
        );

        let index = SpatialIndex::build(points, ids)?;
        stats.elapsed = started.elapsed();
        log::info!(
            "Built index of {} tracklists in {:.2?} (tree depth {})",
            index.len(),
            stats.elapsed,
            index.depth()
        );

        Ok(BuiltIndex { index, stats })
    }

    fn classify(&self, tracklist: &Tracklist) -> Verdict {
        let Some(durations) = tracklist.positive_durations() else {
            return Verdict::MissingDuration;
        };
        if durations.len() < self.min_tracks {
            return Verdict::TooShort;
        }
        Verdict::Keep(durations)
    }

    fn accept(
        &self,
        tracklist: Tracklist,
        points: &mut Vec<Point>,
        ids: &mut Vec<u64>,
        stats: &mut BuildStats,
    ) {
        stats.tracklists += 1;
        match self.classify(&tracklist) {
            Verdict::Keep(durations) => {
                points.push(embed(&durations));
                ids.push(tracklist.id);
                stats.indexed += 1;
            }
            Verdict::MissingDuration => {
                log::debug!("Dropping tracklist {}: missing duration", tracklist.id);
                stats.dropped_missing_duration += 1;
            }
            Verdict::TooShort => {
                log::debug!(
                    "Dropping tracklist {}: {} tracks",
                    tracklist.id,
                    tracklist.track_count()
                );
                stats.dropped_too_short += 1;
            }
        }
    }

    fn report_progress(&self, stats: &BuildStats) {
        match self.expected_tracklists {
            Some(expected) if expected > 0 => {
                let percent = (stats.tracklists as u64 * 100 / expected).min(100);
                log::debug!(
                    "Chunk {}: {} of {} tracklists ({}% done)",
                    stats.chunks,
                    stats.tracklists,
                    expected,
                    percent
                );
            }
            _ => log::debug!(
                "Chunk {}: {} tracklists so far",
                stats.chunks,
                stats.tracklists
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tocmatch_search::SearchError;

    fn rows(tracklist_id: u64, durations: &[i64]) -> Vec<TrackRow> {
        durations
            .iter()
            .enumerate()
            .map(|(i, &d)| TrackRow::new(tracklist_id, i as u32 + 1, d))
            .collect()
    }

    fn single_chunk(rows: Vec<TrackRow>) -> Vec<BuildResult<Vec<TrackRow>>> {
        vec![Ok(rows)]
    }

    #[test]
    fn test_grouper_emits_on_id_change() {
        let mut grouper = TracklistGrouper::new();
        assert_eq!(grouper.push(TrackRow::new(1, 1, 10)).unwrap(), None);
        assert_eq!(grouper.push(TrackRow::new(1, 2, 20)).unwrap(), None);

        let done = grouper.push(TrackRow::new(3, 1, 30)).unwrap().unwrap();
        assert_eq!(done.id, 1);
        assert_eq!(done.durations, vec![10, 20]);

        let last = grouper.finish().unwrap();
        assert_eq!(last.id, 3);
        assert_eq!(last.durations, vec![30]);
    }

    #[test]
    fn test_grouper_rejects_decreasing_id() {
        let mut grouper = TracklistGrouper::new();
        grouper.push(TrackRow::new(5, 1, 10)).unwrap();
        let err = grouper.push(TrackRow::new(4, 1, 10)).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Unordered {
                tracklist_id: 4,
                after_id: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_grouper_rejects_repeated_position() {
        let mut grouper = TracklistGrouper::new();
        grouper.push(TrackRow::new(5, 2, 10)).unwrap();
        assert!(grouper.push(TrackRow::new(5, 2, 10)).is_err());
    }

    #[test]
    fn test_empty_grouper_finishes_empty() {
        assert_eq!(TracklistGrouper::new().finish(), None);
    }

    #[test]
    fn test_tracklist_spanning_chunks() {
        let all = rows(1, &[200_000, 210_000, 190_000, 205_000]);
        let chunks: Vec<BuildResult<Vec<TrackRow>>> =
            vec![Ok(all[..1].to_vec()), Ok(all[1..3].to_vec()), Ok(all[3..].to_vec())];

        let built = IndexBuilder::new().build_from_source(chunks).unwrap();
        assert_eq!(built.stats.chunks, 3);
        assert_eq!(built.stats.indexed, 1);

        let query = embed(&[200_000, 210_000, 190_000, 205_000]);
        let hits = built.index.query(&query, 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].squared_distance, 0);
    }

    #[test]
    fn test_chunking_does_not_change_result() {
        let mut all = rows(1, &[200_000, 210_000, 190_000, 205_000]);
        all.extend(rows(2, &[180_000, 181_000, 182_000, 183_000, 184_000, 185_000]));
        all.extend(rows(7, &[300_000, 200_000, 100_000, 250_000, 260_000]));

        let whole = IndexBuilder::new()
            .build_from_source(single_chunk(all.clone()))
            .unwrap();
        let query = embed(&[181_000, 181_000, 182_000, 183_000, 184_000, 185_000]);
        let expected = whole.index.query(&query, 3);

        for size in 1..all.len() {
            let chunks: Vec<BuildResult<Vec<TrackRow>>> =
                all.chunks(size).map(|c| Ok(c.to_vec())).collect();
            let built = IndexBuilder::new().build_from_source(chunks).unwrap();
            assert_eq!(built.index.query(&query, 3), expected, "chunk size {size}");
        }
    }

    #[test]
    fn test_invalid_tracklists_are_dropped() {
        let mut all = rows(1, &[200_000, 210_000, 190_000, 205_000]);
        all.extend(rows(2, &[200_000, 0, 190_000, 205_000]));
        all.extend(rows(3, &[200_000, 210_000, 190_000]));
        all.extend(rows(4, &[200_000, -1, 190_000, 205_000]));

        let built = IndexBuilder::new()
            .build_from_source(single_chunk(all))
            .unwrap();

        assert_eq!(built.stats.tracklists, 4);
        assert_eq!(built.stats.indexed, 1);
        assert_eq!(built.stats.dropped_missing_duration, 2);
        assert_eq!(built.stats.dropped_too_short, 1);
        assert_eq!(built.stats.dropped(), 3);

        let ids: Vec<u64> = built.index.ids().iter().collect();
        assert_eq!(ids, vec![1]);

        // The dropped tracklist would otherwise be an exact match.
        let query = embed(&[200_000, 210_000, 190_000]);
        assert!(built.index.query(&query, 10).iter().all(|hit| hit.id == 1));
    }

    #[test]
    fn test_no_valid_tracklists_is_empty_batch() {
        let all = rows(3, &[200_000, 210_000, 190_000]);
        let err = IndexBuilder::new()
            .build_from_source(single_chunk(all))
            .unwrap_err();
        assert!(err.is_empty_batch());
        assert!(matches!(err, BuildError::Index(SearchError::EmptyBatch)));
    }

    #[test]
    fn test_empty_source_is_empty_batch() {
        let chunks: Vec<BuildResult<Vec<TrackRow>>> = Vec::new();
        let err = IndexBuilder::new().build_from_source(chunks).unwrap_err();
        assert!(err.is_empty_batch());
    }

    #[test]
    fn test_source_failure_aborts_build() {
        let chunks: Vec<BuildResult<Vec<TrackRow>>> = vec![
            Ok(rows(1, &[200_000, 210_000, 190_000, 205_000])),
            Err(BuildError::SourceUnavailable("connection reset".to_string())),
            Ok(rows(2, &[200_000, 210_000, 190_000, 205_000])),
        ];
        let err = IndexBuilder::new().build_from_source(chunks).unwrap_err();
        assert!(matches!(err, BuildError::SourceUnavailable(_)));
    }

    #[test]
    fn test_build_from_database() {
        let db = Database::open_in_memory().unwrap();
        let mut all = rows(10, &[200_000, 210_000, 190_000, 205_000]);
        all.extend(rows(11, &[500_000, 510_000]));
        db.insert_tracks(&all).unwrap();

        let built = IndexBuilder::new().build_from_database(&db, 3).unwrap();
        assert_eq!(built.stats.rows, 6);
        assert_eq!(built.stats.indexed, 1);
        assert_eq!(built.index.len(), 1);
    }
}
