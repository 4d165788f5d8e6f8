//! Iterative IK: cyclic coordinate descent over a chain of hinge joints.
//!
//! Joints are registered root to tip. Each joint remembers its rest pose
//! relative to the previous joint, so the chain is rebuilt from the solved
//! angles alone: `joint[i] = joint[i-1] * rest_local[i] * rot(axis, angle)`.

use log::debug;
use rigflow_api_core::transform::{axis_angle, unit_or, LENGTH_EPSILON};
use rigflow_api_core::{coercion, Value, Vec3, Xfo};
use serde::{Deserialize, Serialize};

use super::{base_delta, OperatorKind};
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::{NodeId, OperatorId, ParamId, Vertex};

const TARGET: usize = 0;
const BASE: usize = 1;

/// Hinge axis in the joint's local frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JointAxis {
    X,
    Y,
    Z,
    Custom(Vec3),
}

impl JointAxis {
    pub fn vector(self) -> Vec3 {
        match self {
            JointAxis::X => Vec3::X,
            JointAxis::Y => Vec3::Y,
            JointAxis::Z => Vec3::Z,
            JointAxis::Custom(v) => unit_or(v, Vec3::X),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IkJoint {
    node: NodeId,
    axis: Vec3,
    /// Radians.
    limits: [f32; 2],
    rest_local: Xfo,
    rest_global: Xfo,
    angle: f32,
}

impl IkJoint {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn limits(&self) -> [f32; 2] {
        self.limits
    }

    pub fn rest_global(&self) -> Xfo {
        self.rest_global
    }

    /// Current solved angle in radians, relative to the rest pose.
    pub fn angle(&self) -> f32 {
        self.angle
    }
}

#[derive(Clone, Debug)]
pub struct IkSolver {
    joints: Vec<IkJoint>,
    pub iterations: u32,
    pub epsilon: f32,
    /// Fraction of each corrective rotation applied per step.
    pub damping: f32,
    /// End effector position in the tip joint's frame.
    pub effector_offset: Vec3,
    base_rest: Option<Xfo>,
    last_error: f32,
    last_iterations: u32,
}

impl IkSolver {
    pub fn new(iterations: u32, epsilon: f32, damping: f32) -> Self {
        Self {
            joints: Vec::new(),
            iterations,
            epsilon,
            damping: damping.clamp(f32::EPSILON, 1.0),
            effector_offset: Vec3::ZERO,
            base_rest: None,
            last_error: 0.0,
            last_iterations: 0,
        }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(config.ik_iterations, config.ik_epsilon, config.ik_damping)
    }

    pub fn joints(&self) -> &[IkJoint] {
        &self.joints
    }

    pub fn joint_angles(&self) -> Vec<f32> {
        self.joints.iter().map(|j| j.angle).collect()
    }

    /// Effector-to-target distance after the last solve.
    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    pub fn last_iterations(&self) -> u32 {
        self.last_iterations
    }

    fn push_joint(&mut self, node: NodeId, axis: Vec3, limits: [f32; 2], rest_global: Xfo) {
        let rest_local = match self.joints.last() {
            Some(prev) => prev.rest_global.inverse() * rest_global,
            None => rest_global,
        };
        self.joints.push(IkJoint {
            node,
            axis,
            limits,
            rest_local,
            rest_global,
            angle: 0.0,
        });
    }

    /// Recompose joints `from..` from their angles.
    fn forward(&self, root: Xfo, from: usize, globals: &mut [Xfo]) {
        for i in from..self.joints.len() {
            let joint = &self.joints[i];
            let parent = if i == 0 { root } else { globals[i - 1] };
            globals[i] = parent
                * joint.rest_local
                * Xfo::from_rotation(axis_angle(joint.axis, joint.angle));
        }
    }

    fn effector(&self, globals: &[Xfo]) -> Vec3 {
        globals
            .last()
            .map(|tip| tip.transform_point(self.effector_offset))
            .unwrap_or(Vec3::ZERO)
    }

    pub(crate) fn evaluate(&mut self, inputs: &[Option<Value>], outputs: &mut [Value]) -> bool {
        if self.joints.is_empty() {
            return false;
        }
        let Some(target) = inputs.get(TARGET).and_then(Option::as_ref) else {
            return false;
        };
        let target = coercion::as_vec3(target);
        let root = base_delta(inputs.get(BASE).and_then(Option::as_ref), &mut self.base_rest);

        let mut globals = vec![Xfo::IDENTITY; self.joints.len()];
        self.forward(root, 0, &mut globals);
        let mut error = self.effector(&globals).distance(target);
        let mut iterations = 0;

        while iterations < self.iterations && error >= self.epsilon {
            iterations += 1;
            for i in (0..self.joints.len()).rev() {
                let pivot = globals[i].tr;
                let axis = globals[i].ori * self.joints[i].axis;
                let to_effector = (self.effector(&globals) - pivot).reject_from(axis);
                let to_target = (target - pivot).reject_from(axis);
                if to_effector.length() < LENGTH_EPSILON || to_target.length() < LENGTH_EPSILON {
                    continue;
                }
                let delta = axis
                    .dot(to_effector.cross(to_target))
                    .atan2(to_effector.dot(to_target));
                let step = delta * self.damping;

                let joint = &mut self.joints[i];
                let [lo, hi] = joint.limits;
                let angle = (joint.angle + step).clamp(lo, hi);
                if angle == joint.angle {
                    continue;
                }
                joint.angle = angle;
                self.forward(root, i, &mut globals);
            }
            error = self.effector(&globals).distance(target);
        }

        if error >= self.epsilon {
            debug!(
                "ik stopped {error:.5} from target after {iterations} iterations"
            );
        }
        self.last_error = error;
        self.last_iterations = iterations;
        for (out, global) in outputs.iter_mut().zip(globals) {
            *out = Value::Transform(global);
        }
        true
    }
}

impl Graph {
    pub fn add_ik_solver(&mut self, name: impl Into<String>) -> OperatorId {
        let solver = IkSolver::from_config(&self.config);
        self.add_operator(name, OperatorKind::Ik(solver))
    }

    pub fn ik_solver(&self, op: OperatorId) -> Result<&IkSolver, GraphError> {
        match &self.operator(op)?.kind {
            OperatorKind::Ik(solver) => Ok(solver),
            _ => Err(self.wrong_kind(op, "IkSolver")),
        }
    }

    fn ik_solver_mut(&mut self, op: OperatorId) -> Result<&mut IkSolver, GraphError> {
        let wrong = self.wrong_kind(op, "IkSolver");
        match self.operators.get_mut(op.index()).map(|o| &mut o.kind) {
            Some(OperatorKind::Ik(solver)) => Ok(solver),
            Some(_) => Err(wrong),
            None => Err(GraphError::UnknownOperator(op)),
        }
    }

    /// Append a joint to the chain. Its rest pose is the node's current global
    /// transform and its output `Joint{i}` drives the node's `GlobalXfo`.
    pub fn ik_add_joint(
        &mut self,
        op: OperatorId,
        node: NodeId,
        axis: JointAxis,
        limits_deg: [f32; 2],
    ) -> Result<usize, GraphError> {
        let [min, max] = limits_deg;
        let solver = self.ik_solver(op)?;
        let joint_name = self.node(node)?.name.clone();
        if !(min <= max) {
            return Err(GraphError::InvalidJointLimits {
                joint: joint_name,
                min,
                max,
            });
        }
        if solver
            .joints
            .iter()
            .any(|j| j.node == node || self.is_ancestor(node, j.node))
        {
            return Err(GraphError::InvalidChainOrder {
                solver: self.operators[op.index()].name.clone(),
                joint: joint_name,
            });
        }
        let global = self.nodes[node.index()].global;
        if self.params[global.index()].writer.is_some() {
            return Err(GraphError::AlreadyBound(self.param_label(global)));
        }
        self.ensure_acyclic(Vertex::Operator(op), Vertex::Param(global))?;

        let rest = self.global_transform(node)?;
        let solver = self.ik_solver_mut(op)?;
        solver.push_joint(node, axis.vector(), [min.to_radians(), max.to_radians()], rest);
        let index = solver.joints.len() - 1;
        let output = self.add_output_slot(op, format!("Joint{index}"), Value::Transform(rest));
        self.bind(output, global, crate::binding::ValueMap::Identity)?;
        self.mark_dirty(Vertex::Operator(op));
        Ok(index)
    }

    pub fn ik_set_effector_offset(&mut self, op: OperatorId, offset: Vec3) -> Result<(), GraphError> {
        self.ik_solver_mut(op)?.effector_offset = offset;
        self.mark_dirty(Vertex::Operator(op));
        Ok(())
    }

    /// Drive the chain root from `base`; the chain follows the base relative
    /// to where it is now.
    pub fn ik_set_base(&mut self, op: OperatorId, base: ParamId) -> Result<(), GraphError> {
        self.ik_solver(op)?;
        self.connect_input(op, "Base", base)?;
        let rest = self.get_transform(base)?;
        self.ik_solver_mut(op)?.base_rest = Some(rest);
        Ok(())
    }
}
