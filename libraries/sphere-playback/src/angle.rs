//! Angle continuity across camera switches
//!
//! The cameras of a rig stand on a line, [`RIG_BASELINE`] apart. The viewer
//! is assumed to look at a point on one of the two planes parallel to that
//! line at distance `RIG_BASELINE * RIG_HEIGHT_RATIO`. Switching one camera
//! right moves the viewpoint by one baseline; the new yaw is the bearing of
//! the same point from the neighbouring camera. Switching left is the exact
//! inverse, so left-then-right returns to the starting yaw.
//!
//! Renderer yaw is measured from a default orientation that sits 90° off the
//! rig axis, hence [`REFERENCE_OFFSET_DEG`].

use crate::types::{SwitchDirection, ViewAngles};

/// Distance between neighbouring cameras (rig units)
pub const RIG_BASELINE: f64 = 1.0;

/// Distance of the observed plane from the camera line, in baselines
pub const RIG_HEIGHT_RATIO: f64 = 3.0;

/// Renderer's default orientation relative to the rig axis, in degrees
pub const REFERENCE_OFFSET_DEG: f64 = 90.0;

/// Bearings this close to the rig axis look at infinity and keep their yaw
const AXIS_EPSILON: f64 = 1e-9;

/// New yaw (radians) after switching one camera in `direction`
///
/// Returns `None` when no angles are available yet (renderer not
/// initialised); callers then skip angle restoration for that switch.
pub fn continued_yaw(current: Option<ViewAngles>, direction: SwitchDirection) -> Option<f64> {
    current.map(|angles| continued_yaw_radians(angles.yaw, direction))
}

/// New yaw (radians, in `[0, 2π)`) after switching one camera in `direction`
pub fn continued_yaw_radians(yaw: f64, direction: SwitchDirection) -> f64 {
    let bearing = (yaw.to_degrees() - REFERENCE_OFFSET_DEG).rem_euclid(360.0);
    let shifted = match direction {
        SwitchDirection::Next => shift_bearing(bearing, RIG_BASELINE),
        SwitchDirection::Previous => shift_bearing(bearing, -RIG_BASELINE),
    };
    (shifted + REFERENCE_OFFSET_DEG).rem_euclid(360.0).to_radians()
}

/// Bearing (degrees, `[0, 360)`) of the observed point from a camera moved by `offset`
fn shift_bearing(bearing_deg: f64, offset: f64) -> f64 {
    let theta = bearing_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    if sin.abs() < AXIS_EPSILON {
        return bearing_deg;
    }

    let depth = RIG_BASELINE * RIG_HEIGHT_RATIO;
    let range = depth / sin.abs();
    let x = range * cos - offset;
    let y = range * sin;

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Smallest absolute difference between two angles in radians
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(std::f64::consts::TAU);
    diff.min(std::f64::consts::TAU - diff)
}
