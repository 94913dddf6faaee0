use foundation::{GeoPoint, NamedLocation};
use layers::{CompassConfig, CompassConfigError, CompassLayer, LabelFrame, Viewport};
use tracing::{debug, warn};

use crate::heading::{OrientationReading, device_heading};

/// Everything the per-heading update needs, owned in one place.
///
/// The user position and the location list are written during setup and only
/// read afterwards. `last_frame` is replaced wholesale on every update.
#[derive(Debug)]
pub struct Session {
    layer: CompassLayer,
    user: Option<GeoPoint>,
    locations: Vec<NamedLocation>,
    last_frame: Option<LabelFrame>,
    frames_rendered: u64,
    skipped_readings: u64,
}

impl Session {
    pub fn new(config: CompassConfig) -> Self {
        Self {
            layer: CompassLayer::new(config),
            user: None,
            locations: Vec::new(),
            last_frame: None,
            frames_rendered: 0,
            skipped_readings: 0,
        }
    }

    pub fn config(&self) -> &CompassConfig {
        &self.layer.config
    }

    /// Replaces the configuration used by later frames. An invalid
    /// configuration is rejected and the current one stays in effect.
    pub fn set_config(&mut self, config: CompassConfig) -> Result<(), CompassConfigError> {
        config.validate()?;
        self.layer.config = config;
        Ok(())
    }

    pub fn user_position(&self) -> Option<GeoPoint> {
        self.user
    }

    /// Records the user position. The first position wins; later calls are
    /// ignored and return `false`.
    pub fn set_user_position(&mut self, position: GeoPoint) -> bool {
        if self.user.is_some() {
            warn!("user position already acquired, ignoring {position:?}");
            return false;
        }
        self.user = Some(position);
        true
    }

    pub fn locations(&self) -> &[NamedLocation] {
        &self.locations
    }

    pub fn set_locations(&mut self, locations: Vec<NamedLocation>) {
        self.locations = locations;
    }

    pub fn last_frame(&self) -> Option<&LabelFrame> {
        self.last_frame.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn skipped_readings(&self) -> u64 {
        self.skipped_readings
    }

    /// Handles one orientation notification.
    ///
    /// Returns the new frame, or `None` when the reading carried no usable
    /// heading or no user position is known yet. Skipped cycles leave the
    /// previous frame untouched.
    pub fn on_orientation(
        &mut self,
        reading: OrientationReading,
        viewport: Viewport,
    ) -> Option<&LabelFrame> {
        let Some(heading) = device_heading(reading) else {
            self.skipped_readings += 1;
            debug!("orientation reading without heading, skipping");
            return None;
        };
        self.on_heading(heading, viewport)
    }

    pub fn on_heading(&mut self, heading_deg: f64, viewport: Viewport) -> Option<&LabelFrame> {
        let Some(user) = self.user else {
            self.skipped_readings += 1;
            debug!("no user position yet, skipping heading {heading_deg}");
            return None;
        };

        let frame = self
            .layer
            .update(heading_deg, user, &self.locations, viewport);
        self.frames_rendered += 1;
        self.last_frame = Some(frame);
        self.last_frame.as_ref()
    }
}
