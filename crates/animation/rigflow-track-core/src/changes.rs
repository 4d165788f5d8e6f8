//! Undoable track edits.
//!
//! Changes identify keys by time rather than index so that a recorded change
//! stays valid while other keys are inserted or removed around it.

use rigflow_api_core::Xfo;

use crate::data::{Keyframe, Track};
use crate::error::TrackError;

#[derive(Clone, Debug, PartialEq)]
pub enum TrackChange {
    /// A key was inserted at `key.time`, possibly replacing `replaced`.
    AddKey {
        key: Keyframe,
        replaced: Option<Keyframe>,
    },
    /// A key was removed.
    RemoveKey { key: Keyframe },
}

impl TrackChange {
    fn redo(&self, track: &mut Track) -> Result<(), TrackError> {
        match self {
            TrackChange::AddKey { key, .. } => {
                track.insert_key(key.time, key.xfo)?;
            }
            TrackChange::RemoveKey { key } => {
                track.remove_key_at(key.time)?;
            }
        }
        Ok(())
    }

    fn undo(&self, track: &mut Track) -> Result<(), TrackError> {
        match self {
            TrackChange::AddKey { key, replaced } => match replaced {
                Some(previous) => {
                    track.insert_key(previous.time, previous.xfo)?;
                }
                None => {
                    track.remove_key_at(key.time)?;
                }
            },
            TrackChange::RemoveKey { key } => {
                track.insert_key(key.time, key.xfo)?;
            }
        }
        Ok(())
    }
}

/// Linear undo/redo history for edits made to one track.
#[derive(Clone, Debug, Default)]
pub struct TrackHistory {
    undo: Vec<TrackChange>,
    redo: Vec<TrackChange>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    fn record(&mut self, change: TrackChange) {
        self.undo.push(change);
        self.redo.clear();
    }

    /// Insert (or replace) a key and record the change.
    pub fn add_key(&mut self, track: &mut Track, time: f32, xfo: Xfo) -> Result<usize, TrackError> {
        let (index, replaced) = track.insert_key(time, xfo)?;
        let key = track.keys()[index];
        self.record(TrackChange::AddKey { key, replaced });
        Ok(index)
    }

    /// Remove the key at `index` and record the change.
    pub fn remove_key(&mut self, track: &mut Track, index: usize) -> Result<Keyframe, TrackError> {
        let key = track.remove_key(index)?;
        self.record(TrackChange::RemoveKey { key });
        Ok(key)
    }

    pub fn undo(&mut self, track: &mut Track) -> Result<(), TrackError> {
        let change = self.undo.pop().ok_or(TrackError::NothingToUndo)?;
        if let Err(err) = change.undo(track) {
            self.undo.push(change);
            return Err(err);
        }
        self.redo.push(change);
        Ok(())
    }

    pub fn redo(&mut self, track: &mut Track) -> Result<(), TrackError> {
        let change = self.redo.pop().ok_or(TrackError::NothingToRedo)?;
        if let Err(err) = change.redo(track) {
            self.redo.push(change);
            return Err(err);
        }
        self.undo.push(change);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
