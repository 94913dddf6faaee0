use super::normalize_deg;

/// Mean Earth radius (meters), IUGG.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Geographic coordinates in degrees on a spherical Earth.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GeoPointError {
    NotFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl std::fmt::Display for GeoPointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoPointError::NotFinite => write!(f, "coordinates must be finite"),
            GeoPointError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {v} outside [-90, 90]")
            }
            GeoPointError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {v} outside [-180, 180]")
            }
        }
    }
}

impl std::error::Error for GeoPointError {}

impl GeoPoint {
    /// Unchecked constructor.
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub fn try_new(lat_deg: f64, lon_deg: f64) -> Result<Self, GeoPointError> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() {
            return Err(GeoPointError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat_deg) {
            return Err(GeoPointError::LatitudeOutOfRange(lat_deg));
        }
        if !(-180.0..=180.0).contains(&lon_deg) {
            return Err(GeoPointError::LongitudeOutOfRange(lon_deg));
        }
        Ok(Self { lat_deg, lon_deg })
    }

    pub fn is_valid(&self) -> bool {
        Self::try_new(self.lat_deg, self.lon_deg).is_ok()
    }
}

/// Initial great-circle bearing (forward azimuth) from `from` to `to`.
///
/// Returns degrees clockwise from north in `[0, 360)`. Coincident points give
/// whatever direction `atan2` makes of the rounding residue; the result is
/// still finite and in range.
pub fn bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat_deg.to_radians();
    let phi2 = to.lat_deg.to_radians();
    let delta_lambda = (to.lon_deg - from.lon_deg).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_deg(y.atan2(x).to_degrees() + 360.0)
}

/// Great-circle distance (meters) using the haversine formula.
pub fn haversine_distance_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat_deg.to_radians();
    let phi2 = to.lat_deg.to_radians();
    let d_phi = (to.lat_deg - from.lat_deg).to_radians();
    let d_lambda = (to.lon_deg - from.lon_deg).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_MEAN_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::{GeoPoint, GeoPointError, bearing_deg, haversine_distance_m};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn bearing_cardinal_directions_from_origin() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert_close(bearing_deg(origin, GeoPoint::new(0.0, 1.0)), 90.0, 0.5);
        assert_close(bearing_deg(origin, GeoPoint::new(1.0, 0.0)), 0.0, 0.5);
        assert_close(bearing_deg(origin, GeoPoint::new(0.0, -1.0)), 270.0, 0.5);
        assert_close(bearing_deg(origin, GeoPoint::new(-1.0, 0.0)), 180.0, 0.5);
    }

    #[test]
    fn bearing_coincident_points_is_finite_and_in_range() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(40.0, -75.0),
            GeoPoint::new(90.0, 180.0),
            GeoPoint::new(-90.0, -180.0),
            GeoPoint::new(-33.8688, 151.2093),
        ];
        for p in points {
            let b = bearing_deg(p, p);
            assert!(b.is_finite(), "bearing for {p:?} not finite");
            assert!((0.0..360.0).contains(&b), "bearing {b} for {p:?} out of range");
        }
    }

    #[test]
    fn bearing_due_north_stays_near_zero() {
        let b = bearing_deg(GeoPoint::new(40.0, -75.0), GeoPoint::new(40.1, -75.0));
        assert!(b < 1e-9 || b > 360.0 - 1e-9, "got {b}");
        assert!(b < 360.0);
    }

    #[test]
    fn bearing_across_antimeridian() {
        // Fiji to Samoa heads roughly east-north-east across 180.
        let b = bearing_deg(GeoPoint::new(-18.0, 178.0), GeoPoint::new(-14.0, -172.0));
        assert!((60.0..80.0).contains(&b), "got {b}");
    }

    #[test]
    fn haversine_one_degree_at_equator() {
        let d = haversine_distance_m(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert_close(d, 111_195.0, 5.0);
        assert_close(
            haversine_distance_m(GeoPoint::new(12.0, 34.0), GeoPoint::new(12.0, 34.0)),
            0.0,
            1e-9,
        );
    }

    #[test]
    fn try_new_validates_ranges() {
        assert!(GeoPoint::try_new(90.0, -180.0).is_ok());
        assert_eq!(
            GeoPoint::try_new(90.5, 0.0),
            Err(GeoPointError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            GeoPoint::try_new(0.0, 181.0),
            Err(GeoPointError::LongitudeOutOfRange(181.0))
        );
        assert_eq!(GeoPoint::try_new(f64::NAN, 0.0), Err(GeoPointError::NotFinite));
        assert!(!GeoPoint::new(100.0, 0.0).is_valid());
    }
}
