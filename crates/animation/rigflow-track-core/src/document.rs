use rigflow_api_core::transform::{axis_angle, unit_quat};
use rigflow_api_core::{Quat, Vec3, Xfo};
use serde::{Deserialize, Serialize};

use crate::data::{Keyframe, Track};
use crate::error::TrackError;

/// Orientation as persisted: saving always writes `quat`, loading also
/// accepts the axis-angle form produced by hand-authored documents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrientationDoc {
    Quat(Quat),
    AxisAngle { axis: Vec3, angle: f32 },
}

impl OrientationDoc {
    pub fn to_quat(self) -> Quat {
        match self {
            OrientationDoc::Quat(q) => unit_quat(q),
            OrientationDoc::AxisAngle { axis, angle } => axis_angle(axis, angle),
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_orientation() -> OrientationDoc {
    OrientationDoc::Quat(Quat::IDENTITY)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct XfoDoc {
    #[serde(default)]
    pub tr: Vec3,
    #[serde(default = "default_orientation")]
    pub ori: OrientationDoc,
    #[serde(default = "default_scale")]
    pub sc: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyDoc {
    pub time: f32,
    pub xfo: XfoDoc,
}

/// Persisted track document:
/// `{ "name": ..., "keys": [ { "time": t, "xfo": { "tr", "ori", "sc" } } ] }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keys: Vec<KeyDoc>,
}

impl TrackDocument {
    pub fn from_track(track: &Track) -> Self {
        TrackDocument {
            name: track.name().to_string(),
            keys: track
                .keys()
                .iter()
                .map(|k| KeyDoc {
                    time: k.time,
                    xfo: XfoDoc {
                        tr: k.xfo.tr,
                        // keys are stored unit length; written verbatim so the
                        // round trip stays bit-exact
                        ori: OrientationDoc::Quat(k.xfo.ori),
                        sc: k.xfo.sc,
                    },
                })
                .collect(),
        }
    }

    /// Convert into a validated [`Track`]. Keys may appear in any order in the
    /// document but times must be distinct.
    pub fn into_track(self) -> Result<Track, TrackError> {
        let mut keys: Vec<Keyframe> = self
            .keys
            .into_iter()
            .map(|k| {
                let ori = match k.xfo.ori {
                    // the track decides whether it needs normalizing
                    OrientationDoc::Quat(q) => q,
                    other => other.to_quat(),
                };
                Keyframe::new(k.time, Xfo::new(k.xfo.tr, ori, k.xfo.sc))
            })
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Track::from_keys(self.name, keys)
    }
}

/// Parse a persisted track document.
pub fn parse_track_json(s: &str) -> Result<Track, TrackError> {
    let doc: TrackDocument =
        serde_json::from_str(s).map_err(|e| TrackError::Parse(e.to_string()))?;
    doc.into_track()
}

/// Serialize a track into the persisted document shape, pretty printed.
pub fn track_to_json(track: &Track) -> Result<String, TrackError> {
    serde_json::to_string_pretty(&TrackDocument::from_track(track))
        .map_err(|e| TrackError::Serialize(e.to_string()))
}
