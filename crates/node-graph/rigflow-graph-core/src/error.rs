use rigflow_track_core::TrackError;
use thiserror::Error;

use crate::types::{NodeId, OperatorId, ParamId, TrackId};

/// Errors raised by graph construction and host-facing accessors.
///
/// Structural errors (see [`GraphError::is_structural`]) are raised while
/// wiring and always leave the graph unchanged. Evaluation itself never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("connecting {from} -> {to} would create a cycle")]
    Cycle { from: String, to: String },
    #[error("parameter '{0}' already has a writer")]
    AlreadyBound(String),
    #[error("parameter '{0}' is driven by a binding or operator and rejects direct writes")]
    BoundParameter(String),
    #[error("joint '{joint}' cannot be appended to chain '{solver}': joints must be registered root to tip")]
    InvalidChainOrder { solver: String, joint: String },
    #[error("joint '{joint}' has an empty limit interval [{min}, {max}]")]
    InvalidJointLimits { joint: String, min: f32, max: f32 },
    #[error("name '{0}' is not unique")]
    DuplicateName(String),
    #[error("no node named {0}")]
    MissingNode(String),
    #[error("unknown parameter {0}")]
    UnknownParameter(ParamId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown operator {0}")]
    UnknownOperator(OperatorId),
    #[error("operator '{operator}' has no slot named '{slot}'")]
    UnknownSlot { operator: String, slot: String },
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),
    #[error("operator '{operator}' is not a {expected}")]
    WrongOperatorKind {
        operator: String,
        expected: &'static str,
    },
    #[error("invalid graph config: {0}")]
    Config(String),
    #[error(transparent)]
    Track(#[from] TrackError),
}

impl GraphError {
    /// Wiring mistakes that would break the single-writer or acyclic invariants.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphError::Cycle { .. }
                | GraphError::AlreadyBound(_)
                | GraphError::InvalidChainOrder { .. }
                | GraphError::InvalidJointLimits { .. }
        )
    }
}
