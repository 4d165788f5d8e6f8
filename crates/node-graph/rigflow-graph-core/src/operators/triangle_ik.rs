//! Two-bone analytic IK (law of cosines).

use log::debug;
use rigflow_api_core::transform::{axis_angle, rotation_arc, unit, unit_or, unit_quat, LENGTH_EPSILON};
use rigflow_api_core::{coercion, Value, Vec3, Xfo};

use super::{base_delta, OperatorKind};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::{NodeId, OperatorId, Vertex};

const TARGET: usize = 0;
const BASE: usize = 1;

#[derive(Copy, Clone, Debug, PartialEq)]
struct Calibration {
    /// Target position at calibration, in the rest frame.
    tip: Vec3,
    lengths: [f32; 2],
    /// Bend plane normal in the rest frame; rotating the elbow direction
    /// about it by a positive angle moves it towards the tip.
    normal: Vec3,
}

#[derive(Clone, Debug)]
pub struct TriangleIkSolver {
    rest: [Xfo; 2],
    base_rest: Option<Xfo>,
    calibration: Option<Calibration>,
    pub min_reach: f32,
}

impl TriangleIkSolver {
    pub fn new(rest0: Xfo, rest1: Xfo, min_reach: f32) -> Self {
        Self {
            rest: [rest0, rest1],
            base_rest: None,
            calibration: None,
            min_reach,
        }
    }

    pub fn lengths(&self) -> Option<[f32; 2]> {
        self.calibration.map(|c| c.lengths)
    }

    /// Capture the rest tip and link lengths again on the next evaluation.
    pub fn recalibrate(&mut self) {
        self.calibration = None;
    }

    fn calibrate(&self, root: Xfo, target: Vec3) -> Calibration {
        let [j0, j1] = self.rest;
        let tip = root.inverse().transform_point(target);
        let elbow_dir = j1.tr - j0.tr;
        let tip_dir = tip - j0.tr;
        let normal = unit(elbow_dir.cross(tip_dir)).unwrap_or_else(|| j0.ori * Vec3::Z);
        Calibration {
            tip,
            lengths: [elbow_dir.length(), (tip - j1.tr).length()],
            normal,
        }
    }

    pub(crate) fn evaluate(&mut self, inputs: &[Option<Value>], outputs: &mut [Value]) -> bool {
        let Some(target) = inputs.get(TARGET).and_then(Option::as_ref) else {
            return false;
        };
        let target = coercion::as_vec3(target);
        let root = base_delta(inputs.get(BASE).and_then(Option::as_ref), &mut self.base_rest);
        let cal = match self.calibration {
            Some(cal) => cal,
            None => *self.calibration.insert(self.calibrate(root, target)),
        };

        let j0 = root * self.rest[0];
        let j1 = root * self.rest[1];
        let [l0, l1] = cal.lengths;
        if l0 < LENGTH_EPSILON || l1 < LENGTH_EPSILON {
            debug!("triangle ik with a zero-length link; holding rest pose");
            write(outputs, j0, j1);
            return true;
        }

        let p0 = j0.tr;
        let elbow_rest = j1.tr;
        let tip_rest = root.transform_point(cal.tip);
        let rest_dir = unit_or(tip_rest - p0, Vec3::X);
        let to_target = target - p0;
        let dir = unit_or(to_target, rest_dir);

        // a zero reach would divide by zero below
        let lo = (l0 - l1).abs().max(self.min_reach).max(LENGTH_EPSILON);
        let hi = (l0 + l1).max(lo);
        let distance = to_target.length();
        let reach = distance.clamp(lo, hi);
        if reach != distance {
            debug!("triangle ik target distance {distance} clamped to {reach}");
        }

        let cos_a = ((l0 * l0 + reach * reach - l1 * l1) / (2.0 * l0 * reach)).clamp(-1.0, 1.0);
        let normal = unit_or(
            (root.ori * cal.normal).reject_from(dir),
            dir.any_orthogonal_vector(),
        );
        let elbow_dir = axis_angle(normal, -cos_a.acos()) * dir;
        let elbow = p0 + elbow_dir * l0;
        let tip = p0 + dir * reach;

        let r0 = rotation_arc(elbow_rest - p0, elbow - p0);
        let r1 = rotation_arc(tip_rest - elbow_rest, tip - elbow);
        write(
            outputs,
            Xfo::new(p0, unit_quat(r0 * j0.ori), j0.sc),
            Xfo::new(elbow, unit_quat(r1 * j1.ori), j1.sc),
        );
        true
    }
}

fn write(outputs: &mut [Value], joint0: Xfo, joint1: Xfo) {
    if let [a, b, ..] = outputs {
        *a = Value::Transform(joint0);
        *b = Value::Transform(joint1);
    }
}

impl Graph {
    /// Solver driving `joint0` and `joint1`. Their current global transforms
    /// are the rest pose; if `joint0` has a parent, the parent drives `Base`
    /// and its current global transform is the base rest.
    pub fn add_triangle_ik(
        &mut self,
        name: impl Into<String>,
        joint0: NodeId,
        joint1: NodeId,
    ) -> Result<OperatorId, GraphError> {
        let name = name.into();
        self.edit(|g| {
            let rest0 = g.global_transform(joint0)?;
            let rest1 = g.global_transform(joint1)?;
            let mut solver = TriangleIkSolver::new(rest0, rest1, g.config.triangle_min_reach);
            let parent = g.node(joint0)?.parent;
            if let Some(parent) = parent {
                solver.base_rest = Some(g.global_transform(parent)?);
            }
            let op = g.add_operator(name, OperatorKind::TriangleIk(solver));
            if let Some(parent) = parent {
                let base = g.nodes[parent.index()].global;
                g.connect_input(op, "Base", base)?;
            }
            let global0 = g.nodes[joint0.index()].global;
            let global1 = g.nodes[joint1.index()].global;
            g.bind_output(op, "Joint0", global0)?;
            g.bind_output(op, "Joint1", global1)?;
            Ok(op)
        })
    }

    pub fn triangle_ik(&self, op: OperatorId) -> Result<&TriangleIkSolver, GraphError> {
        match &self.operator(op)?.kind {
            OperatorKind::TriangleIk(solver) => Ok(solver),
            _ => Err(self.wrong_kind(op, "TriangleIkSolver")),
        }
    }

    pub fn triangle_ik_recalibrate(&mut self, op: OperatorId) -> Result<(), GraphError> {
        self.triangle_ik(op)?;
        self.modify_operator(op, |kind| {
            if let OperatorKind::TriangleIk(solver) = kind {
                solver.recalibrate();
            }
        })?;
        debug!("recalibrating {}", self.vertex_label(Vertex::Operator(op)));
        Ok(())
    }
}
