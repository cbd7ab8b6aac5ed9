//! Catalog ingestion for tocmatch.
//!
//! Streams tracklist rows out of the catalog, groups and filters them, and
//! builds the search index from the survivors. Also owns the runtime
//! configuration.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod builder;
pub mod config;
pub mod error;

pub use builder::{BuildStats, BuiltIndex, IndexBuilder, TracklistGrouper, MIN_NUMBER_OF_TRACKS};
pub use config::Config;
pub use error::{BuildError, BuildResult};
