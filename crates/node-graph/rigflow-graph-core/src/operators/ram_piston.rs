//! Ram-and-piston linkage: the piston slides along an axis fixed in the ram
//! so that the two bodies keep their rest separation.

use log::warn;
use rigflow_api_core::transform::unit;
use rigflow_api_core::{coercion, Value, Vec3, Xfo};

use super::OperatorKind;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::{NodeId, OperatorId};

const RAM: usize = 0;
const PISTON: usize = 1;
const RAM_LOCAL: usize = 2;
const PISTON_LOCAL: usize = 3;

#[derive(Clone, Debug)]
pub struct RamAndPiston {
    /// Slide axis in the ram's frame, unit length.
    axis: Vec3,
    rest_separation: Option<f32>,
}

impl RamAndPiston {
    pub fn new(axis: Vec3) -> Self {
        let axis = unit(axis).unwrap_or_else(|| {
            warn!("ram-and-piston axis {axis:?} has no direction; using X");
            Vec3::X
        });
        Self {
            axis,
            rest_separation: None,
        }
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn rest_separation(&self) -> Option<f32> {
        self.rest_separation
    }

    pub fn recalibrate(&mut self) {
        self.rest_separation = None;
    }

    pub(crate) fn evaluate(&mut self, inputs: &[Option<Value>], outputs: &mut [Value]) -> bool {
        let input = |i: usize| inputs.get(i).and_then(Option::as_ref).map(coercion::as_xfo);
        let (Some(ram_frame), Some(piston_frame)) = (input(RAM), input(PISTON)) else {
            return false;
        };
        let ram = ram_frame * input(RAM_LOCAL).unwrap_or(Xfo::IDENTITY);
        let piston = piston_frame * input(PISTON_LOCAL).unwrap_or(Xfo::IDENTITY);

        let axis = ram.ori * self.axis;
        let offset = piston.tr - ram.tr;
        let along = offset.dot(axis);
        let perpendicular = offset - axis * along;
        let separation = *self.rest_separation.get_or_insert(along);

        if let [ram_out, piston_out, ..] = outputs {
            *ram_out = Value::Transform(ram);
            *piston_out = Value::Transform(Xfo::new(
                ram.tr + axis * separation + perpendicular,
                piston.ori,
                piston.sc,
            ));
        }
        true
    }
}

impl Graph {
    /// Link two scene nodes. Each body's pose is fed from its parent's global
    /// and its own local transform; the outputs drive both `GlobalXfo`s.
    pub fn add_ram_and_piston(
        &mut self,
        name: impl Into<String>,
        axis: Vec3,
        ram: NodeId,
        piston: NodeId,
    ) -> Result<OperatorId, GraphError> {
        let name = name.into();
        self.edit(|g| {
            let op = g.add_operator(name, OperatorKind::RamAndPiston(RamAndPiston::new(axis)));
            for (node, frame_slot, local_slot) in [(ram, "Ram", "RamLocal"), (piston, "Piston", "PistonLocal")] {
                let n = g.node(node)?;
                let (local, parent) = (n.local, n.parent);
                match parent {
                    Some(parent) => {
                        let parent_global = g.nodes[parent.index()].global;
                        g.connect_input(op, frame_slot, parent_global)?;
                        g.connect_input(op, local_slot, local)?;
                    }
                    None => g.connect_input(op, frame_slot, local)?,
                }
            }
            let ram_global = g.nodes[ram.index()].global;
            let piston_global = g.nodes[piston.index()].global;
            g.bind_output(op, "Ram", ram_global)?;
            g.bind_output(op, "Piston", piston_global)?;
            Ok(op)
        })
    }

    pub fn ram_and_piston(&self, op: OperatorId) -> Result<&RamAndPiston, GraphError> {
        match &self.operator(op)?.kind {
            OperatorKind::RamAndPiston(linkage) => Ok(linkage),
            _ => Err(self.wrong_kind(op, "RamAndPiston")),
        }
    }

    pub fn ram_and_piston_recalibrate(&mut self, op: OperatorId) -> Result<(), GraphError> {
        self.ram_and_piston(op)?;
        self.modify_operator(op, |kind| {
            if let OperatorKind::RamAndPiston(linkage) = kind {
                linkage.recalibrate();
            }
        })
    }
}
