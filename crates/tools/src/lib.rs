//! Helpers behind the `compass` command line tool.

use foundation::{GeoPoint, NamedLocation};
use layers::{CompassConfig, OffsetMode, Viewport, compute_labels};
use serde::Serialize;

pub const ENV_THRESHOLD: &str = "COMPASS_THRESHOLD_DEG";
pub const ENV_SPREAD: &str = "COMPASS_SPREAD_DEG";
pub const ENV_OFFSET_MODE: &str = "COMPASS_OFFSET_MODE";

/// Parses `LAT,LON` in degrees and validates the ranges.
pub fn parse_lat_lon(s: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude {lat:?}: {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude {lon:?}: {e}"))?;
    GeoPoint::try_new(lat, lon).map_err(|e| e.to_string())
}

/// Builds the compass configuration from environment-style lookups.
///
/// Missing keys keep their defaults; present but unparsable values are errors.
pub fn config_from_env<F>(lookup: F) -> Result<CompassConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = CompassConfig::default();
    if let Some(v) = lookup(ENV_THRESHOLD) {
        config.threshold_deg = v
            .trim()
            .parse()
            .map_err(|e| format!("{ENV_THRESHOLD}={v:?}: {e}"))?;
    }
    if let Some(v) = lookup(ENV_SPREAD) {
        config.spread_deg = v
            .trim()
            .parse()
            .map_err(|e| format!("{ENV_SPREAD}={v:?}: {e}"))?;
    }
    if let Some(v) = lookup(ENV_OFFSET_MODE) {
        config.offset_mode = v
            .parse::<OffsetMode>()
            .map_err(|e| format!("{ENV_OFFSET_MODE}: {e}"))?;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Cities visible at one heading of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepStep {
    pub heading_deg: f64,
    pub visible: Vec<String>,
}

/// Smallest heading increment `sweep` accepts (36 000 frames per circle).
pub const MIN_SWEEP_STEP_DEG: f64 = 0.01;

/// Evaluates the full circle in `step_deg` increments starting at north.
pub fn sweep(
    config: &CompassConfig,
    user: GeoPoint,
    locations: &[NamedLocation],
    step_deg: f64,
) -> Result<Vec<SweepStep>, String> {
    if !step_deg.is_finite() || step_deg < MIN_SWEEP_STEP_DEG {
        return Err(format!(
            "sweep step must be at least {MIN_SWEEP_STEP_DEG} degrees, got {step_deg}"
        ));
    }
    let viewport = Viewport::new(1.0, 1.0);
    let steps = (360.0 / step_deg).ceil() as usize;
    let frames = (0..steps)
        .map(|i| i as f64 * step_deg)
        .filter(|h| *h < 360.0)
        .map(|heading_deg| {
            let frame = compute_labels(config, heading_deg, user, locations, viewport);
            SweepStep {
                heading_deg,
                visible: frame.labels.into_iter().map(|l| l.text).collect(),
            }
        })
        .collect();
    Ok(frames)
}
