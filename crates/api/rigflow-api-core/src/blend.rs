//! Blending for transform values: translation and scale lerp, orientation
//! slerps along the shortest arc.

use crate::transform::{unit_quat, Xfo};

/// TRS interpolation between two transforms.
pub fn blend_xfo(a: &Xfo, b: &Xfo, t: f32) -> Xfo {
    Xfo {
        tr: a.tr.lerp(b.tr, t),
        ori: unit_quat(a.ori).slerp(unit_quat(b.ori), t),
        sc: a.sc.lerp(b.sc, t),
    }
}
