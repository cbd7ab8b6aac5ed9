pub mod track;

pub use track::{TrackRow, Tracklist};
