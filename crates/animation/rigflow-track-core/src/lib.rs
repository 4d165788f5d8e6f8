//! rigflow track core
//!
//! Keyframed transform tracks: a time-ordered list of `(time, Xfo)` keys that
//! can be sampled at any time, edited with undo/redo and persisted as JSON.

pub mod changes;
pub mod data;
pub mod document;
pub mod error;
pub mod sampling;

pub use changes::{TrackChange, TrackHistory};
pub use data::{Keyframe, Track};
pub use document::{parse_track_json, track_to_json, TrackDocument};
pub use error::TrackError;
pub use sampling::sample_track;
