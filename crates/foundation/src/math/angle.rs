//! Compass angle helpers.
//!
//! All angles are degrees, clockwise from north.

/// Folds `deg` into `[0, 360)`.
///
/// Never returns `360.0`, even when rounding of a tiny negative input would
/// land there. NaN passes through unchanged.
pub fn normalize_deg(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    if r >= 360.0 { 0.0 } else { r }
}

/// Absolute shortest distance between two directions, in `[0, 180]`.
///
/// Inputs need not be normalized: 400 and 40 are the same direction.
pub fn shortest_angle_deg(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    d.min(360.0 - d)
}

/// Signed shortest deviation of `to` relative to `from`, in `(-180, 180]`.
///
/// Positive means `to` lies clockwise of `from`.
pub fn signed_angle_deg(from: f64, to: f64) -> f64 {
    let d = normalize_deg(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Clockwise deviation of `to` relative to `from`, in `[0, 360)`.
pub fn wrapped_angle_deg(from: f64, to: f64) -> f64 {
    normalize_deg(to - from + 360.0)
}
