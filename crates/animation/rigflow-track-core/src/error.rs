use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    #[error("track json parse error: {0}")]
    Parse(String),
    #[error("serialize track: {0}")]
    Serialize(String),
    #[error("keyframe time must be finite and non-negative, got {0}")]
    InvalidTime(f32),
    #[error("keyframe {index} at time {time} is not after its predecessor")]
    NonMonotonic { index: usize, time: f32 },
    #[error("no keyframe at index {0}")]
    UnknownKey(usize),
    #[error("no keyframe at time {0}")]
    NoKeyAtTime(f32),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}
