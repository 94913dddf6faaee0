use std::fmt;
use std::str::FromStr;

use foundation::NamedLocation;
use foundation::math::{
    GeoPoint, bearing_deg, haversine_distance_m, shortest_angle_deg, signed_angle_deg,
    wrapped_angle_deg,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::labels::{LabelFrame, VisibleLabel};

/// Half-width of the viewing cone (degrees). The cone is twice this wide.
pub const DEFAULT_THRESHOLD_DEG: f64 = 15.0;
/// Angular deviation that maps onto one full viewport width (degrees).
pub const DEFAULT_SPREAD_DEG: f64 = 30.0;

/// How the angular deviation used for label placement is measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetMode {
    /// Signed shortest deviation in `(-180, 180]`. Points counter-clockwise of
    /// the heading get negative offsets.
    #[default]
    Signed,
    /// `(bearing - heading + 360) mod 360`. Points just counter-clockwise of
    /// the heading land near 360 and far off-screen to the right.
    Wrapped,
}

impl FromStr for OffsetMode {
    type Err = CompassConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signed" => Ok(OffsetMode::Signed),
            "wrapped" | "legacy" => Ok(OffsetMode::Wrapped),
            other => Err(CompassConfigError::UnknownOffsetMode(other.to_string())),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompassConfig {
    pub threshold_deg: f64,
    pub spread_deg: f64,
    pub offset_mode: OffsetMode,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            threshold_deg: DEFAULT_THRESHOLD_DEG,
            spread_deg: DEFAULT_SPREAD_DEG,
            offset_mode: OffsetMode::Signed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompassConfigError {
    InvalidThreshold(f64),
    InvalidSpread(f64),
    UnknownOffsetMode(String),
}

impl fmt::Display for CompassConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompassConfigError::InvalidThreshold(v) => {
                write!(f, "threshold must be finite and within [0, 180], got {v}")
            }
            CompassConfigError::InvalidSpread(v) => {
                write!(f, "spread must be finite and positive, got {v}")
            }
            CompassConfigError::UnknownOffsetMode(s) => {
                write!(f, "unknown offset mode {s:?} (expected \"signed\" or \"wrapped\")")
            }
        }
    }
}

impl std::error::Error for CompassConfigError {}

impl CompassConfig {
    pub fn validate(&self) -> Result<(), CompassConfigError> {
        if !self.threshold_deg.is_finite() || !(0.0..=180.0).contains(&self.threshold_deg) {
            return Err(CompassConfigError::InvalidThreshold(self.threshold_deg));
        }
        if !self.spread_deg.is_finite() || self.spread_deg <= 0.0 {
            return Err(CompassConfigError::InvalidSpread(self.spread_deg));
        }
        Ok(())
    }
}

/// Current display size in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    pub fn center_y_px(&self) -> f64 {
        self.height_px * 0.5
    }
}

/// Whether `bearing_deg` lies within `threshold_deg` of `heading_deg`.
///
/// The comparison uses the shortest distance around the circle and is
/// inclusive at the boundary.
pub fn is_in_view(heading_deg: f64, bearing_deg: f64, threshold_deg: f64) -> bool {
    shortest_angle_deg(heading_deg, bearing_deg) <= threshold_deg
}

pub fn angle_offset_deg(heading_deg: f64, bearing_deg: f64, mode: OffsetMode) -> f64 {
    match mode {
        OffsetMode::Signed => signed_angle_deg(heading_deg, bearing_deg),
        OffsetMode::Wrapped => wrapped_angle_deg(heading_deg, bearing_deg),
    }
}

/// Evaluates every location against the viewing cone and returns the labels
/// to draw, in input order.
pub fn compute_labels(
    config: &CompassConfig,
    heading_deg: f64,
    user: GeoPoint,
    locations: &[NamedLocation],
    viewport: Viewport,
) -> LabelFrame {
    let mut labels = Vec::new();

    for location in locations {
        let bearing = bearing_deg(user, location.point);
        if !is_in_view(heading_deg, bearing, config.threshold_deg) {
            continue;
        }

        let offset = angle_offset_deg(heading_deg, bearing, config.offset_mode);
        labels.push(VisibleLabel {
            text: location.name.clone(),
            bearing_deg: bearing,
            angle_offset_deg: offset,
            x_px: (offset / config.spread_deg) * viewport.width_px,
            y_px: viewport.center_y_px(),
            distance_m: haversine_distance_m(user, location.point),
        });
    }

    debug!(
        heading_deg,
        visible = labels.len(),
        total = locations.len(),
        "compass frame"
    );

    LabelFrame {
        heading_deg,
        labels,
    }
}

/// Stateless overlay layer that turns a heading into a label frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CompassLayer {
    pub config: CompassConfig,
}

impl CompassLayer {
    pub fn new(config: CompassConfig) -> Self {
        Self { config }
    }

    pub fn update(
        &self,
        heading_deg: f64,
        user: GeoPoint,
        locations: &[NamedLocation],
        viewport: Viewport,
    ) -> LabelFrame {
        compute_labels(&self.config, heading_deg, user, locations, viewport)
    }
}
