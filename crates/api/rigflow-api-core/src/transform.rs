//! TRS transforms (`Xfo`) over `glam` vectors and quaternions.
//!
//! `glam`'s serde impls write vectors and quaternions as plain arrays
//! (`[x, y, z]` and `[x, y, z, w]`), which is the persisted shape.
//!
//! `glam` expects unit inputs for its rotation constructors; the helpers here
//! accept anything and degrade to identity instead of producing NaN.

use serde::{Deserialize, Serialize};
use std::ops::Mul;

pub use glam::{Quat, Vec3};

/// Threshold under which a length is treated as zero.
pub const LENGTH_EPSILON: f32 = 1e-6;

/// Unit-length copy of `v`, or `None` when it is (nearly) zero or not finite.
pub fn unit(v: Vec3) -> Option<Vec3> {
    let len = v.length();
    (len > LENGTH_EPSILON && len.is_finite()).then(|| v / len)
}

pub fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    unit(v).unwrap_or(fallback)
}

/// Unit-length copy of `q`; a zero or non-finite quaternion becomes identity.
pub fn unit_quat(q: Quat) -> Quat {
    let len = q.length();
    if len > LENGTH_EPSILON && len.is_finite() {
        q * (1.0 / len)
    } else {
        Quat::IDENTITY
    }
}

/// Rotation of `angle` radians about `axis`, which need not be unit length.
/// A zero axis yields identity.
pub fn axis_angle(axis: Vec3, angle: f32) -> Quat {
    unit(axis).map_or(Quat::IDENTITY, |a| Quat::from_axis_angle(a, angle))
}

/// Shortest rotation taking direction `from` onto direction `to`.
pub fn rotation_arc(from: Vec3, to: Vec3) -> Quat {
    match (unit(from), unit(to)) {
        (Some(a), Some(b)) => Quat::from_rotation_arc(a, b),
        _ => Quat::IDENTITY,
    }
}

/// Angle in radians between two orientations, well conditioned near zero.
pub fn rotation_angle(a: Quat, b: Quat) -> f32 {
    let delta = unit_quat(a).conjugate() * unit_quat(b);
    2.0 * delta.xyz().length().atan2(delta.w.abs())
}

/// Translation / orientation / scale transform.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Xfo {
    pub tr: Vec3,
    pub ori: Quat,
    pub sc: Vec3,
}

impl Default for Xfo {
    fn default() -> Self {
        Xfo::IDENTITY
    }
}

impl Xfo {
    pub const IDENTITY: Xfo = Xfo {
        tr: Vec3::ZERO,
        ori: Quat::IDENTITY,
        sc: Vec3::ONE,
    };

    pub fn new(tr: Vec3, ori: Quat, sc: Vec3) -> Self {
        Xfo { tr, ori, sc }
    }

    pub fn from_translation(tr: Vec3) -> Self {
        Xfo {
            tr,
            ..Xfo::IDENTITY
        }
    }

    pub fn from_rotation(ori: Quat) -> Self {
        Xfo {
            ori,
            ..Xfo::IDENTITY
        }
    }

    pub fn from_tr_ori(tr: Vec3, ori: Quat) -> Self {
        Xfo {
            tr,
            ori,
            sc: Vec3::ONE,
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.tr + self.ori * (self.sc * p)
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.ori * (self.sc * v)
    }

    /// Inverse transform. Exact for uniform scale; zero scale components are
    /// left at 1 instead of producing infinities.
    pub fn inverse(&self) -> Xfo {
        let recip = |s: f32| if s.abs() > LENGTH_EPSILON { 1.0 / s } else { 1.0 };
        let sc = Vec3::new(recip(self.sc.x), recip(self.sc.y), recip(self.sc.z));
        let ori = unit_quat(self.ori).inverse();
        let tr = (ori * -self.tr) * sc;
        Xfo { tr, ori, sc }
    }

    pub fn abs_diff_eq(&self, other: &Xfo, eps: f32) -> bool {
        self.tr.abs_diff_eq(other.tr, eps)
            && self.sc.abs_diff_eq(other.sc, eps)
            && rotation_angle(self.ori, other.ori) <= eps
    }
}

impl Mul for Xfo {
    type Output = Xfo;
    /// `parent * local`: `local` expressed in `parent`'s frame.
    fn mul(self, local: Xfo) -> Xfo {
        Xfo {
            tr: self.transform_point(local.tr),
            ori: unit_quat(self.ori * local.ori),
            sc: self.sc * local.sc,
        }
    }
}
