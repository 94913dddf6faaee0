use foundation::math::normalize_deg;

/// Raw values from one `deviceorientation` notification.
///
/// `compass_heading_deg` is the WebKit compass heading (clockwise from north).
/// `alpha_deg` is the standard rotation about the z axis, counter-clockwise.
/// Either may be missing depending on platform and sensor state.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct OrientationReading {
    pub compass_heading_deg: Option<f64>,
    pub alpha_deg: Option<f64>,
}

impl OrientationReading {
    pub fn from_alpha(alpha_deg: f64) -> Self {
        Self {
            compass_heading_deg: None,
            alpha_deg: Some(alpha_deg),
        }
    }

    pub fn from_compass(compass_heading_deg: f64) -> Self {
        Self {
            compass_heading_deg: Some(compass_heading_deg),
            alpha_deg: None,
        }
    }
}

/// Device heading in `[0, 360)`, clockwise from north.
///
/// Prefers the compass heading; falls back to `360 - alpha`. Returns `None`
/// when neither value is usable, which callers treat as "skip this cycle".
pub fn device_heading(reading: OrientationReading) -> Option<f64> {
    if let Some(h) = reading.compass_heading_deg.filter(|v| v.is_finite()) {
        return Some(normalize_deg(h));
    }
    let alpha = reading.alpha_deg.filter(|v| v.is_finite())?;
    Some(normalize_deg(360.0 - alpha))
}
