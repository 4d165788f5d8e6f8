//! Time-windowed attachment: a body follows one target after another as
//! time crosses each target's activation threshold.

use rigflow_api_core::{coercion, Value, Xfo};

use super::OperatorKind;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::{OperatorId, ParamId, Vertex};

const TIME: usize = 0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttachTarget {
    pub time: f32,
    pub offset: Xfo,
    /// Input slot the target transform arrives on.
    slot: usize,
}

impl AttachTarget {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

#[derive(Clone, Debug, Default)]
pub struct AttachmentConstraint {
    /// Sorted by `time`; equal times keep registration order.
    targets: Vec<AttachTarget>,
}

impl AttachmentConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> &[AttachTarget] {
        &self.targets
    }

    fn insert(&mut self, time: f32, offset: Xfo, slot: usize) {
        let at = self.targets.partition_point(|t| t.time <= time);
        self.targets.insert(at, AttachTarget { time, offset, slot });
    }

    /// Target with the greatest activation time not after `time`.
    pub fn active_target(&self, time: f32) -> Option<&AttachTarget> {
        let n = self.targets.partition_point(|t| t.time <= time);
        n.checked_sub(1).map(|i| &self.targets[i])
    }

    pub(crate) fn evaluate(&mut self, inputs: &[Option<Value>], outputs: &mut [Value]) -> bool {
        let Some(time) = inputs.get(TIME).and_then(Option::as_ref) else {
            return false;
        };
        let Some(target) = self.active_target(coercion::as_float(time)) else {
            return false;
        };
        let Some(source) = inputs.get(target.slot).and_then(Option::as_ref) else {
            return false;
        };
        match outputs.first_mut() {
            Some(out) => {
                *out = Value::Transform(coercion::as_xfo(source) * target.offset);
                true
            }
            None => false,
        }
    }
}

impl Graph {
    /// Constraint reading `time`. Bind its `Attached` output to the driven
    /// parameter with [`Graph::bind_output`].
    pub fn add_attachment_constraint(
        &mut self,
        name: impl Into<String>,
        time: ParamId,
    ) -> Result<OperatorId, GraphError> {
        let name = name.into();
        self.edit(|g| {
            let op = g.add_operator(name, OperatorKind::Attachment(AttachmentConstraint::new()));
            g.connect_input(op, "Time", time)?;
            Ok(op)
        })
    }

    pub fn attachment(&self, op: OperatorId) -> Result<&AttachmentConstraint, GraphError> {
        match &self.operator(op)?.kind {
            OperatorKind::Attachment(constraint) => Ok(constraint),
            _ => Err(self.wrong_kind(op, "AttachmentConstraint")),
        }
    }

    /// Follow `target` (times `offset`) from `time` on. Returns the index of
    /// the new `Target{i}` input slot.
    pub fn attachment_add_target(
        &mut self,
        op: OperatorId,
        target: ParamId,
        time: f32,
        offset: Xfo,
    ) -> Result<usize, GraphError> {
        let count = self.attachment(op)?.targets.len();
        self.param(target)?;
        self.ensure_acyclic(Vertex::Param(target), Vertex::Operator(op))?;
        self.edit(|g| {
            let slot = g.add_input_slot(op, format!("Target{count}"), true);
            g.connect_input(op, &format!("Target{count}"), target)?;
            g.modify_operator(op, |kind| {
                if let OperatorKind::Attachment(constraint) = kind {
                    constraint.insert(time, offset, slot);
                }
            })?;
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigflow_api_core::Vec3;

    #[test]
    fn step_function_over_thresholds() {
        let mut c = AttachmentConstraint::new();
        c.insert(5400.0, Xfo::IDENTITY, 2);
        c.insert(2600.0, Xfo::IDENTITY, 1);
        assert!(c.active_target(0.0).is_none());
        assert_eq!(c.active_target(2599.9), None);
        assert_eq!(c.active_target(2600.0).map(|t| t.slot), Some(1));
        assert_eq!(c.active_target(5399.0).map(|t| t.slot), Some(1));
        assert_eq!(c.active_target(7000.0).map(|t| t.slot), Some(2));
    }

    #[test]
    fn later_registration_wins_a_tie() {
        let mut c = AttachmentConstraint::new();
        c.insert(10.0, Xfo::IDENTITY, 1);
        c.insert(10.0, Xfo::IDENTITY, 2);
        assert_eq!(c.active_target(10.0).map(|t| t.slot), Some(2));
    }

    #[test]
    fn offset_is_applied_in_target_frame() {
        let mut c = AttachmentConstraint::new();
        let offset = Xfo::from_translation(Vec3::new(0.0, 0.0, 1.0));
        c.insert(0.0, offset, 1);
        let target = Xfo::from_translation(Vec3::new(3.0, 0.0, 0.0));
        let mut out = vec![Value::Transform(Xfo::IDENTITY)];
        assert!(c.evaluate(&[Some(Value::f(1.0)), Some(Value::Transform(target))], &mut out));
        assert_eq!(coercion::as_xfo(&out[0]).tr, Vec3::new(3.0, 0.0, 1.0));
    }
}
