//! Core domain for tocmatch.
//!
//! This crate holds the pieces every other tocmatch crate builds on: the
//! CD table-of-contents codec, the fixed-dimension duration embedding, the
//! catalog row model, and the SQLite catalog schema.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod embed;
pub mod error;
pub mod model;
pub mod schema;
pub mod toc;

pub use embed::{embed, Point, DIMENSIONS};
pub use error::{Error, Result};
pub use model::{Tracklist, TrackRow};
pub use toc::{Toc, TocError};
