//! Fixed-dimension embedding of track duration sequences.
//!
//! Dimension 0 carries the track count scaled by [`TRACK_COUNT_SCALE`], so
//! tracklists of different lengths land far apart. The remaining
//! [`DURATION_SLOTS`] dimensions hold the durations themselves: copied and
//! zero padded for short tracklists, summed into contiguous buckets for
//! long ones.

use std::fmt;
use std::ops::Index;

/// Number of coordinates in a [`Point`].
pub const DIMENSIONS: usize = 6;

/// Coordinates available for duration data.
pub const DURATION_SLOTS: usize = DIMENSIONS - 1;

/// Multiplier applied to the track count in dimension 0.
pub const TRACK_COUNT_SCALE: u64 = 10_000;

/// A point in tracklist space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point([u64; DIMENSIONS]);

impl Point {
    #[must_use]
    pub const fn new(coords: [u64; DIMENSIONS]) -> Self {
        Self(coords)
    }

    #[must_use]
    pub const fn coords(&self) -> &[u64; DIMENSIONS] {
        &self.0
    }

    /// Sum of squared per-axis differences.
    ///
    /// Saturates instead of overflowing, which keeps absurd catalog values
    /// at maximum distance.
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> u64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let diff = a.abs_diff(*b);
                diff.saturating_mul(diff)
            })
            .fold(0_u64, u64::saturating_add)
    }
}

impl Index<usize> for Point {
    type Output = u64;

    fn index(&self, dim: usize) -> &u64 {
        &self.0[dim]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, coord) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{coord}")?;
        }
        write!(f, "]")
    }
}

/// Embed a duration sequence (milliseconds) as a [`Point`].
///
/// Empty input is filtered out before it gets here; it embeds as the
/// origin.
#[must_use]
pub fn embed(durations: &[u64]) -> Point {
    let n = durations.len();
    let mut coords = [0_u64; DIMENSIONS];
    coords[0] = (n as u64).saturating_mul(TRACK_COUNT_SCALE);

    if n <= DURATION_SLOTS {
        coords[1..=n].copy_from_slice(durations);
        return Point(coords);
    }

    // Bucket i covers [floor(i*n/K), floor((i+1)*n/K)). Integer arithmetic
    // gives the same floors as a real-valued step without rounding drift.
    for (bucket, slot) in coords[1..].iter_mut().enumerate() {
        let start = bucket * n / DURATION_SLOTS;
        let end = (bucket + 1) * n / DURATION_SLOTS;
        *slot = durations[start..end]
            .iter()
            .fold(0_u64, |sum, &d| sum.saturating_add(d));
    }

    Point(coords)
}
