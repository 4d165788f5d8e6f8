//! Canonical track data model.

use rigflow_api_core::transform::unit_quat;
use rigflow_api_core::{Quat, Xfo};

use crate::error::TrackError;
use crate::sampling::sample_track;

/// A single key: a transform pinned at an absolute time (engine time units).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub xfo: Xfo,
}

impl Keyframe {
    pub fn new(time: f32, xfo: Xfo) -> Self {
        Keyframe { time, xfo }
    }
}

/// Keys sorted strictly increasing by time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    name: String,
    keys: Vec<Keyframe>,
}

fn check_time(time: f32) -> Result<(), TrackError> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(TrackError::InvalidTime(time))
    }
}

/// Stored form of a key: `-0.0` folded into `0.0` so `total_cmp` lookups
/// agree, orientation unit length. Already-unit orientations are kept bit
/// for bit, which makes this idempotent.
fn canonical(key: Keyframe) -> Keyframe {
    let ori = if (key.xfo.ori.length() - 1.0).abs() <= 1e-6 {
        key.xfo.ori
    } else {
        unit_quat(key.xfo.ori)
    };
    Keyframe::new(key.time + 0.0, Xfo { ori, ..key.xfo })
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Track {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    /// Build a track from keys that must already be strictly increasing in time.
    pub fn from_keys(name: impl Into<String>, keys: Vec<Keyframe>) -> Result<Self, TrackError> {
        let keys: Vec<Keyframe> = keys.into_iter().map(canonical).collect();
        let mut last = None;
        for (index, key) in keys.iter().enumerate() {
            check_time(key.time)?;
            if let Some(prev) = last {
                if key.time <= prev {
                    return Err(TrackError::NonMonotonic {
                        index,
                        time: key.time,
                    });
                }
            }
            last = Some(key.time);
        }
        Ok(Track {
            name: name.into(),
            keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(first, last)` key times, `None` for an empty track.
    pub fn time_range(&self) -> Option<(f32, f32)> {
        match (self.keys.first(), self.keys.last()) {
            (Some(a), Some(b)) => Some((a.time, b.time)),
            _ => None,
        }
    }

    /// Index of the key sitting exactly at `time`.
    pub fn key_index_at(&self, time: f32) -> Option<usize> {
        self.keys
            .binary_search_by(|k| k.time.total_cmp(&time))
            .ok()
    }

    /// Insert a key, keeping the order. A key already present at `time` is
    /// replaced and returned.
    pub fn insert_key(&mut self, time: f32, xfo: Xfo) -> Result<(usize, Option<Keyframe>), TrackError> {
        check_time(time)?;
        let key = canonical(Keyframe::new(time, xfo));
        match self.keys.binary_search_by(|k| k.time.total_cmp(&key.time)) {
            Ok(index) => {
                let previous = std::mem::replace(&mut self.keys[index], key);
                Ok((index, Some(previous)))
            }
            Err(index) => {
                self.keys.insert(index, key);
                Ok((index, None))
            }
        }
    }

    pub fn remove_key(&mut self, index: usize) -> Result<Keyframe, TrackError> {
        if index >= self.keys.len() {
            return Err(TrackError::UnknownKey(index));
        }
        Ok(self.keys.remove(index))
    }

    pub fn remove_key_at(&mut self, time: f32) -> Result<Keyframe, TrackError> {
        let index = self.key_index_at(time).ok_or(TrackError::NoKeyAtTime(time))?;
        self.remove_key(index)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Interpolated transform at `time`; `None` for an empty track.
    pub fn sample(&self, time: f32) -> Option<Xfo> {
        sample_track(self, time)
    }
}
