/// One catalog row: a track's length within a tracklist.
///
/// `duration_ms` is signed because the catalog stores unknown lengths as
/// zero (or, in damaged imports, negative values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRow {
    pub tracklist_id: u64,
    pub position: u32,
    pub duration_ms: i64,
}

impl TrackRow {
    #[must_use]
    pub const fn new(tracklist_id: u64, position: u32, duration_ms: i64) -> Self {
        Self {
            tracklist_id,
            position,
            duration_ms,
        }
    }
}

/// All rows of one tracklist, in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracklist {
    pub id: u64,
    pub durations: Vec<i64>,
}

impl Tracklist {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            durations: Vec::new(),
        }
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.durations.len()
    }

    /// Durations as unsigned milliseconds, or `None` if any is missing.
    #[must_use]
    pub fn positive_durations(&self) -> Option<Vec<u64>> {
        self.durations
            .iter()
            .map(|&d| u64::try_from(d).ok().filter(|&d| d > 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracklist_missing_duration() {
        let mut tracklist = Tracklist::new(7);
        tracklist.durations = vec![1000, 0, 2000];
        assert_eq!(tracklist.positive_durations(), None);
    }

    #[test]
    fn test_tracklist_negative_duration_is_missing() {
        let mut tracklist = Tracklist::new(7);
        tracklist.durations = vec![1000, -5];
        assert_eq!(tracklist.positive_durations(), None);
    }

    #[test]
    fn test_tracklist_positive_durations() {
        let mut tracklist = Tracklist::new(7);
        tracklist.durations = vec![1000, 2000, 3000];
        assert_eq!(tracklist.track_count(), 3);
        assert_eq!(tracklist.positive_durations(), Some(vec![1000, 2000, 3000]));
    }
}
