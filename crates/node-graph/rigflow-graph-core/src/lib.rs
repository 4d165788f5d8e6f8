//! rigflow graph core
//!
//! A parameter dataflow graph for articulated scenes. Typed [`Parameter`]s are
//! connected by single-writer [`Binding`]s, scene nodes compose their global
//! transforms from their ancestors, and operators (IK solvers, linkages,
//! attachment switching, track sampling) derive new values each frame. Changes
//! mark dependents dirty; the scheduler in [`eval`] recomputes only what is
//! dirty, dependencies first.
//!
//! The [`Graph`] owns everything in arenas addressed by the ids in [`types`].

pub mod binding;
pub mod config;
pub mod edit;
pub mod error;
pub mod eval;
pub mod graph;
pub mod load;
pub mod names;
pub mod operators;
pub mod param;
pub mod scene;
pub mod topo;
pub mod tracks;
pub mod types;

pub use binding::{Binding, ValueMap};
pub use config::{GraphConfig, WritePolicy};
pub use edit::GraphEdit;
pub use error::GraphError;
pub use eval::{evaluate_all, EvalReport};
pub use graph::Graph;
pub use load::{AssetLoader, LoadError, LoadQueue, LoadTicket, NodeHierarchy};
pub use names::NameMap;
pub use operators::{JointAxis, OperatorEntry, OperatorKind};
pub use param::{ParamOwner, Parameter, Writer};
pub use scene::SceneNode;
pub use topo::topo_order;
pub use types::{BindingId, NodeId, OperatorId, ParamId, TrackId, Vertex};

pub use rigflow_api_core::{Quat, Value, Vec3, Xfo};
