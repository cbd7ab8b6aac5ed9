//! Nearest-neighbour search for tocmatch.
//!
//! Holds the immutable k-d tree built over embedded catalog tracklists and
//! the lookup path that turns a raw TOC into ranked catalog matches.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod kdtree;
pub mod lookup;

pub use error::{Result, SearchError};
pub use kdtree::{ExternalIdTable, Neighbor, SpatialIndex};
pub use lookup::{format_matches, lookup, IndexHandle, LookupService, TocMatch, LOOKUP_FANOUT};
