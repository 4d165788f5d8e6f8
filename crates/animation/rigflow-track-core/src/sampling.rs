//! Track sampling.
//!
//! Model:
//! - Keys are ordered strictly by absolute time.
//! - Outside `[first.time, last.time]` the nearest endpoint is returned.
//! - Exactly at a key time the key's transform is returned untouched.
//! - Between keys translation/scale lerp and orientation slerps (shortest arc).
//!
//! Sampling is a pure function of `(track, time)`, so callers may scrub
//! backwards or jump around freely.

use rigflow_api_core::blend::blend_xfo;
use rigflow_api_core::Xfo;

use crate::data::{Keyframe, Track};

/// Locate the segment `[i, i+1]` containing `time` and the normalized position
/// inside it. Returns `Err(index)` when `time` lands on a key or outside the
/// key range and the sample is exactly `keys[index]`.
fn find_segment(keys: &[Keyframe], time: f32) -> Result<(usize, f32), usize> {
    let n = keys.len();
    if time <= keys[0].time {
        return Err(0);
    }
    if time >= keys[n - 1].time {
        return Err(n - 1);
    }
    // First key strictly after `time`; guaranteed in 1..n by the checks above.
    let upper = keys.partition_point(|k| k.time <= time);
    let lower = upper - 1;
    if keys[lower].time == time {
        return Err(lower);
    }
    let t0 = keys[lower].time;
    let t1 = keys[upper].time;
    let local = ((time - t0) / (t1 - t0)).clamp(0.0, 1.0);
    Ok((lower, local))
}

/// Sample a track at an absolute time. `None` when the track has no keys.
pub fn sample_track(track: &Track, time: f32) -> Option<Xfo> {
    let keys = track.keys();
    match keys.len() {
        0 => None,
        1 => Some(keys[0].xfo),
        _ => {
            let time = if time.is_nan() { keys[0].time } else { time };
            match find_segment(keys, time) {
                Err(index) => Some(keys[index].xfo),
                Ok((i, local)) => Some(blend_xfo(&keys[i].xfo, &keys[i + 1].xfo, local)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigflow_api_core::transform::rotation_angle;
    use rigflow_api_core::{Quat, Vec3};

    fn track() -> Track {
        let mut t = Track::new("t");
        t.insert_key(1000.0, Xfo::from_translation(Vec3::new(0.0, 0.0, 0.0)))
            .unwrap();
        t.insert_key(
            2000.0,
            Xfo::new(
                Vec3::new(10.0, 0.0, 0.0),
                Quat::from_axis_angle(Vec3::Z, 1.0),
                Vec3::ONE,
            ),
        )
        .unwrap();
        t
    }

    #[test]
    fn clamps_outside_range() {
        let t = track();
        assert_eq!(sample_track(&t, 0.0), Some(t.keys()[0].xfo));
        assert_eq!(sample_track(&t, 9000.0), Some(t.keys()[1].xfo));
    }

    #[test]
    fn interpolates_midpoint() {
        let t = track();
        let mid = sample_track(&t, 1500.0).unwrap();
        assert!(mid.tr.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert!(rotation_angle(mid.ori, Quat::from_axis_angle(Vec3::Z, 0.5)) < 1e-4);
    }

    #[test]
    fn empty_track_has_no_sample() {
        assert_eq!(sample_track(&Track::new("empty"), 1.0), None);
    }
}
