//! CD table-of-contents codec.
//!
//! A TOC arrives as a single ASCII line:
//!
//! ```text
//! <first> <num_tracks> <leadout> <offset_1> <offset_2> ... <offset_n>
//! ```
//!
//! All values are CD sector counts. [`Toc::parse`] validates the line and
//! [`Toc::durations`] turns the offsets into per-track durations in
//! milliseconds.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// CD audio runs at 75 sectors per second.
pub const SECTORS_PER_SECOND: u64 = 75;

/// Highest track count a disc can carry.
pub const MAX_NUM_TRACKS: u32 = 99;

/// Reasons a TOC string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TocError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("{field} is not a sector count: {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("first track must be 1, got {0}")]
    FirstTrack(u32),

    #[error("track count must be between 1 and 99, got {0}")]
    TrackCount(u32),

    #[error("expected {expected} offsets, got {actual}")]
    OffsetCount { expected: u32, actual: usize },

    #[error("offset {offset} is not before the leadout {leadout}")]
    OffsetPastLeadout { offset: u32, leadout: u32 },

    #[error("offset {offset} does not follow {previous}")]
    OffsetsNotIncreasing { previous: u32, offset: u32 },
}

/// A validated table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    first_track: u32,
    leadout: u32,
    offsets: Vec<u32>,
}

impl Toc {
    /// Parse and validate a raw TOC string.
    pub fn parse(raw: &str) -> Result<Self, TocError> {
        let mut fields = raw.split_whitespace();

        let first_track = parse_field(fields.next(), "first track")?;
        let num_tracks = parse_field(fields.next(), "track count")?;
        let leadout = parse_field(fields.next(), "leadout")?;
        let offsets = fields
            .map(|value| parse_sectors(value, "offset"))
            .collect::<Result<Vec<u32>, _>>()?;

        if first_track != 1 {
            return Err(TocError::FirstTrack(first_track));
        }
        if !(1..=MAX_NUM_TRACKS).contains(&num_tracks) {
            return Err(TocError::TrackCount(num_tracks));
        }
        if offsets.len() != num_tracks as usize {
            return Err(TocError::OffsetCount {
                expected: num_tracks,
                actual: offsets.len(),
            });
        }
        if let Some(&offset) = offsets.iter().find(|&&offset| offset >= leadout) {
            return Err(TocError::OffsetPastLeadout { offset, leadout });
        }
        if let Some(pair) = offsets.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(TocError::OffsetsNotIncreasing {
                previous: pair[0],
                offset: pair[1],
            });
        }

        Ok(Self {
            first_track,
            leadout,
            offsets,
        })
    }

    #[must_use]
    pub const fn first_track(&self) -> u32 {
        self.first_track
    }

    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub const fn leadout(&self) -> u32 {
        self.leadout
    }

    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Per-track durations in milliseconds, truncated.
    ///
    /// The leadout closes the last track, so the result always has
    /// `num_tracks` entries.
    #[must_use]
    pub fn durations(&self) -> Vec<u64> {
        self.offsets
            .iter()
            .copied()
            .chain(std::iter::once(self.leadout))
            .collect::<Vec<_>>()
            .windows(2)
            .map(|pair| sectors_to_ms(u64::from(pair[1] - pair[0])))
            .collect()
    }
}

impl FromStr for Toc {
    type Err = TocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Toc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first_track, self.offsets.len(), self.leadout)?;
        for offset in &self.offsets {
            write!(f, " {offset}")?;
        }
        Ok(())
    }
}

/// Returns `true` when `raw` is a well-formed TOC.
pub fn validate(raw: &str) -> bool {
    Toc::parse(raw).is_ok()
}

/// Durations in milliseconds for `raw`, or an empty sequence when the TOC
/// does not validate.
pub fn decode_durations(raw: &str) -> Vec<u64> {
    Toc::parse(raw).map(|toc| toc.durations()).unwrap_or_default()
}

/// Convert a sector count to whole milliseconds.
#[must_use]
pub const fn sectors_to_ms(sectors: u64) -> u64 {
    sectors * 1000 / SECTORS_PER_SECOND
}

fn parse_field(value: Option<&str>, field: &'static str) -> Result<u32, TocError> {
    match value {
        Some(value) if !value.is_empty() => parse_sectors(value, field),
        _ => Err(TocError::MissingField(field)),
    }
}

fn parse_sectors(value: &str, field: &'static str) -> Result<u32, TocError> {
    value.parse().map_err(|_| TocError::NotAnInteger {
        field,
        value: value.to_string(),
    })
}
