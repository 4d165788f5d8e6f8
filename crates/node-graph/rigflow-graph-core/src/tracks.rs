//! Track registry. Tracks live in the graph so samplers can reference them by
//! id; every edit made through the graph re-flags the samplers reading them.

use log::debug;
use rigflow_api_core::Xfo;
use rigflow_track_core::{parse_track_json, track_to_json, Keyframe, Track, TrackHistory};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::operators::OperatorKind;
use crate::types::{OperatorId, TrackId, Vertex};

#[derive(Clone, Debug)]
pub struct TrackSlot {
    pub(crate) track: Track,
    pub(crate) history: TrackHistory,
}

impl TrackSlot {
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }
}

impl Graph {
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = TrackId::from_index(self.tracks.len());
        self.tracks.push(TrackSlot {
            track,
            history: TrackHistory::new(),
        });
        id
    }

    pub fn track(&self, id: TrackId) -> Result<&Track, GraphError> {
        self.tracks
            .get(id.index())
            .map(|slot| &slot.track)
            .ok_or(GraphError::UnknownTrack(id))
    }

    pub fn track_history(&self, id: TrackId) -> Result<&TrackHistory, GraphError> {
        self.tracks
            .get(id.index())
            .map(|slot| &slot.history)
            .ok_or(GraphError::UnknownTrack(id))
    }

    /// Apply `f` to a track and its history, then re-flag its samplers.
    fn edit_track<R>(
        &mut self,
        id: TrackId,
        f: impl FnOnce(&mut Track, &mut TrackHistory) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        let slot = self
            .tracks
            .get_mut(id.index())
            .ok_or(GraphError::UnknownTrack(id))?;
        let out = f(&mut slot.track, &mut slot.history)?;
        for op in self.samplers_of(id) {
            self.mark_dirty(Vertex::Operator(op));
        }
        Ok(out)
    }

    fn samplers_of(&self, id: TrackId) -> Vec<OperatorId> {
        self.operators()
            .filter(|(_, entry)| matches!(&entry.kind, OperatorKind::TrackSampler(s) if s.track() == id))
            .map(|(op, _)| op)
            .collect()
    }

    /// Insert or replace a key; undoable.
    pub fn add_track_key(&mut self, id: TrackId, time: f32, xfo: Xfo) -> Result<usize, GraphError> {
        self.edit_track(id, |track, history| Ok(history.add_key(track, time, xfo)?))
    }

    pub fn remove_track_key(&mut self, id: TrackId, index: usize) -> Result<Keyframe, GraphError> {
        self.edit_track(id, |track, history| Ok(history.remove_key(track, index)?))
    }

    pub fn undo_track_edit(&mut self, id: TrackId) -> Result<(), GraphError> {
        self.edit_track(id, |track, history| Ok(history.undo(track)?))
    }

    pub fn redo_track_edit(&mut self, id: TrackId) -> Result<(), GraphError> {
        self.edit_track(id, |track, history| Ok(history.redo(track)?))
    }

    /// Replace a track's keys from a track document. The undo history is
    /// cleared; on a parse error the track is left as it was.
    pub fn load_track_json(&mut self, id: TrackId, json: &str) -> Result<(), GraphError> {
        let loaded = parse_track_json(json)?;
        debug!("loaded track '{}' with {} keys", loaded.name(), loaded.len());
        self.edit_track(id, |track, history| {
            *track = loaded;
            history.clear();
            Ok(())
        })
    }

    pub fn save_track_json(&self, id: TrackId) -> Result<String, GraphError> {
        Ok(track_to_json(self.track(id)?)?)
    }
}
