use crate::math::GeoPoint;

/// A point of interest with a display name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocation {
    pub name: String,
    pub point: GeoPoint,
}

impl NamedLocation {
    pub fn new(name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            name: name.into(),
            point,
        }
    }
}
