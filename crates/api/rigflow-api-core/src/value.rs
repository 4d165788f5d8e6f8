//! Value: the payload carried by every parameter in the graph.

use serde::{Deserialize, Serialize};

use crate::transform::{Vec3, Xfo};

/// Coarse kind tag, handy for dispatch and diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Float,
    Vec3,
    Transform,
    Reference,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar float
    Float(f32),

    /// 3D vector
    Vec3(Vec3),

    /// Transform with translation, rotation (quat), scale
    Transform(Xfo),

    /// Opaque handle owned by a host collaborator (asset id, material name, ...)
    Reference(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Transform(_) => ValueKind::Transform,
            Value::Reference(_) => ValueKind::Reference,
        }
    }

    /// Convenience constructors
    pub fn f(v: f32) -> Self {
        Value::Float(v)
    }

    pub fn vec3(x: f32, y: f32, z: f32) -> Self {
        Value::Vec3(Vec3::new(x, y, z))
    }

    pub fn xfo(xfo: Xfo) -> Self {
        Value::Transform(xfo)
    }

    pub fn as_transform(&self) -> Option<&Xfo> {
        match self {
            Value::Transform(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

/// Narrowing; lets untyped float literals stand in for values.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v as f32)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vec3(v)
    }
}

impl From<Xfo> for Value {
    fn from(x: Xfo) -> Self {
        Value::Transform(x)
    }
}
