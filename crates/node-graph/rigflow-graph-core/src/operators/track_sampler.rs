use rigflow_api_core::{coercion, Value};
use rigflow_track_core::sample_track;

use super::{EvalContext, OperatorKind};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::{OperatorId, ParamId, TrackId};

const TIME: usize = 0;

/// Samples a registered track at the `Time` input. Stateless, so scrubbing
/// backwards or restarting playback needs no reset.
#[derive(Clone, Debug)]
pub struct TrackSampler {
    track: TrackId,
}

impl TrackSampler {
    pub fn new(track: TrackId) -> Self {
        Self { track }
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub(crate) fn evaluate(
        &mut self,
        inputs: &[Option<Value>],
        outputs: &mut [Value],
        ctx: &EvalContext,
    ) -> bool {
        let Some(time) = inputs.get(TIME).and_then(Option::as_ref) else {
            return false;
        };
        let Some(slot) = ctx.tracks.get(self.track.index()) else {
            return false;
        };
        match (sample_track(&slot.track, coercion::as_float(time)), outputs.first_mut()) {
            (Some(xfo), Some(out)) => {
                *out = Value::Transform(xfo);
                true
            }
            _ => false,
        }
    }
}

impl Graph {
    pub fn add_track_sampler(
        &mut self,
        name: impl Into<String>,
        track: TrackId,
        time: ParamId,
    ) -> Result<OperatorId, GraphError> {
        self.track(track)?;
        let name = name.into();
        self.edit(|g| {
            let op = g.add_operator(name, OperatorKind::TrackSampler(TrackSampler::new(track)));
            g.connect_input(op, "Time", time)?;
            Ok(op)
        })
    }

    pub fn track_sampler(&self, op: OperatorId) -> Result<&TrackSampler, GraphError> {
        match &self.operator(op)?.kind {
            OperatorKind::TrackSampler(sampler) => Ok(sampler),
            _ => Err(self.wrong_kind(op, "TrackSampler")),
        }
    }
}
