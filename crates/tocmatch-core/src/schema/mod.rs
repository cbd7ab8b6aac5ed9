//! SQLite catalog of tracklist durations.

pub mod db;
pub mod migrations;

pub use db::{Database, TrackChunks};
