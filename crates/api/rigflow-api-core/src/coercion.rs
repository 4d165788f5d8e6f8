//! Lossy conversions between value kinds used by operators that accept more
//! than one shape on an input slot.

use crate::transform::{Vec3, Xfo};
use crate::Value;

/// Scalar view: vectors report their X component, transforms their X translation.
pub fn as_float(v: &Value) -> f32 {
    match v {
        Value::Float(f) => *f,
        Value::Vec3(a) => a.x,
        Value::Transform(x) => x.tr.x,
        Value::Reference(_) => 0.0,
    }
}

/// Vector view: scalars broadcast, transforms yield their translation.
pub fn as_vec3(v: &Value) -> Vec3 {
    match v {
        Value::Float(f) => Vec3::splat(*f),
        Value::Vec3(a) => *a,
        Value::Transform(x) => x.tr,
        Value::Reference(_) => Vec3::ZERO,
    }
}

/// Transform view: vectors become pure translations, everything else identity.
pub fn as_xfo(v: &Value) -> Xfo {
    match v {
        Value::Transform(x) => *x,
        Value::Vec3(a) => Xfo::from_translation(*a),
        _ => Xfo::IDENTITY,
    }
}
