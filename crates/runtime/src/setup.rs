//! One-shot acquisition pipeline.
//!
//! Stages run strictly in order: city list, geolocation, camera, orientation
//! permission. Each capability is requested exactly once; the first failure
//! ends the pipeline and is reported with its stage. Nothing here retries.

use std::fmt;

use foundation::GeoPoint;
use formats::CityList;
use layers::CompassConfig;

use crate::event_bus::{Event, EventBus, EventKind};
use crate::session::Session;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SetupStage {
    LoadCities,
    Geolocation,
    Camera,
    OrientationPermission,
}

impl SetupStage {
    pub const ALL: [SetupStage; 4] = [
        SetupStage::LoadCities,
        SetupStage::Geolocation,
        SetupStage::Camera,
        SetupStage::OrientationPermission,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SetupStage::LoadCities => "load-cities",
            SetupStage::Geolocation => "geolocation",
            SetupStage::Camera => "camera",
            SetupStage::OrientationPermission => "orientation-permission",
        }
    }
}

/// Geolocation failure, mirroring the browser's `GeolocationPositionError`
/// codes plus "no API at all".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    Unsupported,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl GeolocationError {
    /// Maps a `GeolocationPositionError.code`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::PositionUnavailable,
        }
    }

    /// Maps the `code` of whatever the browser rejected with. A value
    /// without a numeric code is an exception thrown by the API itself,
    /// not a position error, so the API is treated as unusable.
    pub fn from_reported_code(code: Option<f64>) -> Self {
        match code {
            Some(c) if c.is_finite() && c >= 0.0 => Self::from_code(c as u16),
            _ => GeolocationError::Unsupported,
        }
    }
}

/// Outcome of asking for orientation events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// The platform delivers events without an explicit grant.
    NotRequired,
    Denied,
    /// No orientation events on this platform.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    CitiesUnavailable(String),
    CitiesMalformed(String),
    GeolocationUnsupported,
    GeolocationDenied,
    GeolocationUnavailable,
    GeolocationTimeout,
    CameraDenied(String),
    OrientationUnsupported,
    OrientationDenied,
    OrientationRequestFailed(String),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::CitiesUnavailable(msg) => write!(f, "Error fetching city data: {msg}"),
            SetupError::CitiesMalformed(msg) => write!(f, "City data is malformed: {msg}"),
            SetupError::GeolocationUnsupported => {
                write!(f, "Geolocation is not supported by your browser.")
            }
            SetupError::GeolocationDenied => write!(f, "Permission denied for geolocation."),
            SetupError::GeolocationUnavailable => write!(f, "Location is unavailable."),
            SetupError::GeolocationTimeout => write!(f, "Timed out obtaining location."),
            SetupError::CameraDenied(msg) => write!(f, "Error accessing the camera: {msg}"),
            SetupError::OrientationUnsupported => {
                write!(f, "Device Orientation is not supported by your browser.")
            }
            SetupError::OrientationDenied => write!(f, "Permission denied for device orientation."),
            SetupError::OrientationRequestFailed(msg) => {
                write!(f, "Orientation permission request failed: {msg}")
            }
        }
    }
}

impl std::error::Error for SetupError {}

impl SetupError {
    pub fn stage(&self) -> SetupStage {
        match self {
            SetupError::CitiesUnavailable(_) | SetupError::CitiesMalformed(_) => {
                SetupStage::LoadCities
            }
            SetupError::GeolocationUnsupported
            | SetupError::GeolocationDenied
            | SetupError::GeolocationUnavailable
            | SetupError::GeolocationTimeout => SetupStage::Geolocation,
            SetupError::CameraDenied(_) => SetupStage::Camera,
            SetupError::OrientationUnsupported
            | SetupError::OrientationDenied
            | SetupError::OrientationRequestFailed(_) => SetupStage::OrientationPermission,
        }
    }

    /// Whether the failure deserves a visible notice rather than only a log
    /// entry. Only failures the user can act on are surfaced.
    pub fn user_notice(&self) -> bool {
        matches!(
            self,
            SetupError::GeolocationUnsupported
                | SetupError::GeolocationDenied
                | SetupError::CameraDenied(_)
                | SetupError::OrientationUnsupported
                | SetupError::OrientationDenied
        )
    }
}

impl From<GeolocationError> for SetupError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::Unsupported => SetupError::GeolocationUnsupported,
            GeolocationError::PermissionDenied => SetupError::GeolocationDenied,
            GeolocationError::PositionUnavailable => SetupError::GeolocationUnavailable,
            GeolocationError::Timeout => SetupError::GeolocationTimeout,
        }
    }
}

// Providers are driven on a single-threaded event loop, so the returned
// futures are not required to be `Send`.

#[allow(async_fn_in_trait)]
pub trait CitySource {
    /// Fetches the raw city list document.
    async fn fetch_cities(&self) -> Result<String, String>;
}

#[allow(async_fn_in_trait)]
pub trait GeolocationProvider {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError>;
}

#[allow(async_fn_in_trait)]
pub trait CameraProvider {
    /// Opens the rear-facing camera and starts playback.
    async fn open_environment_camera(&self) -> Result<(), String>;
}

#[allow(async_fn_in_trait)]
pub trait OrientationPermission {
    async fn request(&self) -> Result<PermissionState, String>;
}

#[derive(Debug)]
pub struct SetupComplete {
    pub session: Session,
    pub events: Vec<Event>,
}

#[derive(Debug)]
pub struct SetupFailure {
    pub error: SetupError,
    pub events: Vec<Event>,
}

impl fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "setup failed at {}: {}", self.error.stage().name(), self.error)
    }
}

impl std::error::Error for SetupFailure {}

pub struct SetupPipeline<C, G, K, O> {
    pub cities: C,
    pub geolocation: G,
    pub camera: K,
    pub orientation: O,
    pub config: CompassConfig,
}

impl<C, G, K, O> SetupPipeline<C, G, K, O>
where
    C: CitySource,
    G: GeolocationProvider,
    K: CameraProvider,
    O: OrientationPermission,
{
    pub async fn run(self) -> Result<SetupComplete, SetupFailure> {
        let mut bus = EventBus::new();
        match self.run_stages(&mut bus).await {
            Ok(session) => Ok(SetupComplete {
                session,
                events: bus.drain(),
            }),
            Err(error) => {
                bus.emit(error.stage(), EventKind::Failed, error.to_string());
                Err(SetupFailure {
                    error,
                    events: bus.drain(),
                })
            }
        }
    }

    async fn run_stages(&self, bus: &mut EventBus) -> Result<Session, SetupError> {
        let mut session = Session::new(self.config);

        bus.emit(SetupStage::LoadCities, EventKind::Started, "fetching city list");
        let payload = self
            .cities
            .fetch_cities()
            .await
            .map_err(SetupError::CitiesUnavailable)?;
        let list = CityList::from_json_str(&payload)
            .map_err(|e| SetupError::CitiesMalformed(e.to_string()))?;
        if list.rejected > 0 {
            bus.emit(
                SetupStage::LoadCities,
                EventKind::Note,
                format!("dropped {} invalid city records", list.rejected),
            );
        }
        bus.emit(
            SetupStage::LoadCities,
            EventKind::Succeeded,
            format!("loaded {} cities", list.len()),
        );
        session.set_locations(list.into_locations());

        bus.emit(SetupStage::Geolocation, EventKind::Started, "requesting position");
        let position = self.geolocation.current_position().await?;
        if !position.is_valid() {
            return Err(SetupError::GeolocationUnavailable);
        }
        session.set_user_position(position);
        bus.emit(
            SetupStage::Geolocation,
            EventKind::Succeeded,
            format!("position {:.5},{:.5}", position.lat_deg, position.lon_deg),
        );

        bus.emit(SetupStage::Camera, EventKind::Started, "opening environment camera");
        self.camera
            .open_environment_camera()
            .await
            .map_err(SetupError::CameraDenied)?;
        bus.emit(SetupStage::Camera, EventKind::Succeeded, "camera streaming");

        bus.emit(
            SetupStage::OrientationPermission,
            EventKind::Started,
            "requesting orientation events",
        );
        let permission = self
            .orientation
            .request()
            .await
            .map_err(SetupError::OrientationRequestFailed)?;
        match permission {
            PermissionState::Granted | PermissionState::NotRequired => {}
            PermissionState::Denied => return Err(SetupError::OrientationDenied),
            PermissionState::Unsupported => return Err(SetupError::OrientationUnsupported),
        }
        bus.emit(
            SetupStage::OrientationPermission,
            EventKind::Succeeded,
            format!("orientation {permission:?}"),
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use pretty_assertions::assert_eq;

    const CITIES: &str = r#"[
        {"name": "North", "latitude": 40.1, "longitude": -75.0},
        {"name": "Broken", "latitude": 123.0, "longitude": -75.0}
    ]"#;

    struct FakeCities(Result<&'static str, &'static str>, Cell<u32>);

    impl CitySource for FakeCities {
        async fn fetch_cities(&self) -> Result<String, String> {
            self.1.set(self.1.get() + 1);
            self.0.map(str::to_string).map_err(str::to_string)
        }
    }

    struct FakeGeo(Result<GeoPoint, GeolocationError>, Cell<u32>);

    impl GeolocationProvider for FakeGeo {
        async fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
            self.1.set(self.1.get() + 1);
            self.0.clone()
        }
    }

    struct FakeCamera(Result<(), &'static str>, Cell<u32>);

    impl CameraProvider for FakeCamera {
        async fn open_environment_camera(&self) -> Result<(), String> {
            self.1.set(self.1.get() + 1);
            self.0.map_err(str::to_string)
        }
    }

    struct FakeOrientation(Result<PermissionState, &'static str>, Cell<u32>);

    impl OrientationPermission for FakeOrientation {
        async fn request(&self) -> Result<PermissionState, String> {
            self.1.set(self.1.get() + 1);
            self.0.map_err(str::to_string)
        }
    }

    type FakePipeline = SetupPipeline<FakeCities, FakeGeo, FakeCamera, FakeOrientation>;

    fn pipeline() -> FakePipeline {
        SetupPipeline {
            cities: FakeCities(Ok(CITIES), Cell::new(0)),
            geolocation: FakeGeo(Ok(GeoPoint::new(40.0, -75.0)), Cell::new(0)),
            camera: FakeCamera(Ok(()), Cell::new(0)),
            orientation: FakeOrientation(Ok(PermissionState::NotRequired), Cell::new(0)),
            config: CompassConfig::default(),
        }
    }

    fn run(p: FakePipeline) -> Result<SetupComplete, SetupFailure> {
        pollster::block_on(p.run())
    }

    #[test]
    fn happy_path_builds_a_ready_session() {
        let done = run(pipeline()).expect("setup");
        assert_eq!(done.session.locations().len(), 1);
        assert_eq!(done.session.user_position(), Some(GeoPoint::new(40.0, -75.0)));

        let succeeded: Vec<SetupStage> = done
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Succeeded)
            .map(|e| e.stage)
            .collect();
        assert_eq!(succeeded, SetupStage::ALL.to_vec());
        assert!(done.events.iter().any(|e| e.kind == EventKind::Note));
    }

    #[test]
    fn city_fetch_failure_stops_everything() {
        let mut p = pipeline();
        p.cities = FakeCities(Err("404"), Cell::new(0));

        let failure = run(p).unwrap_err();
        assert_eq!(failure.error, SetupError::CitiesUnavailable("404".to_string()));
        assert_eq!(failure.error.stage(), SetupStage::LoadCities);
        assert!(!failure.error.user_notice());
        let last = failure.events.last().expect("events");
        assert_eq!(last.kind, EventKind::Failed);
        assert_eq!(last.stage, SetupStage::LoadCities);
    }

    #[test]
    fn malformed_city_list_is_its_own_failure() {
        let mut p = pipeline();
        p.cities = FakeCities(Ok("{not json"), Cell::new(0));
        let failure = run(p).unwrap_err();
        assert!(matches!(failure.error, SetupError::CitiesMalformed(_)));
    }

    #[test]
    fn geolocation_errors_map_to_named_states() {
        let cases = [
            (GeolocationError::Unsupported, SetupError::GeolocationUnsupported),
            (GeolocationError::PermissionDenied, SetupError::GeolocationDenied),
            (GeolocationError::PositionUnavailable, SetupError::GeolocationUnavailable),
            (GeolocationError::Timeout, SetupError::GeolocationTimeout),
        ];
        for (geo_err, expected) in cases {
            let mut p = pipeline();
            p.geolocation = FakeGeo(Err(geo_err), Cell::new(0));
            let failure = run(p).unwrap_err();
            assert_eq!(failure.error, expected);
            assert_eq!(failure.error.stage(), SetupStage::Geolocation);
        }
        assert_eq!(GeolocationError::from_code(1), GeolocationError::PermissionDenied);
        assert_eq!(GeolocationError::from_code(2), GeolocationError::PositionUnavailable);
        assert_eq!(GeolocationError::from_code(3), GeolocationError::Timeout);
    }

    #[test]
    fn thrown_geolocation_errors_without_a_code_mean_unsupported() {
        assert_eq!(
            GeolocationError::from_reported_code(Some(1.0)),
            GeolocationError::PermissionDenied
        );
        assert_eq!(
            GeolocationError::from_reported_code(Some(2.0)),
            GeolocationError::PositionUnavailable
        );
        assert_eq!(
            GeolocationError::from_reported_code(None),
            GeolocationError::Unsupported
        );
        assert_eq!(
            GeolocationError::from_reported_code(Some(f64::NAN)),
            GeolocationError::Unsupported
        );

        // The pipeline turns it into a user-facing failure instead of waiting.
        let mut p = pipeline();
        p.geolocation = FakeGeo(Err(GeolocationError::from_reported_code(None)), Cell::new(0));
        let failure = run(p).unwrap_err();
        assert_eq!(failure.error, SetupError::GeolocationUnsupported);
        assert!(failure.error.user_notice());
    }

    #[test]
    fn each_stage_is_attempted_once_and_later_stages_are_not_reached() {
        let p = SetupPipeline {
            camera: FakeCamera(Err("NotAllowedError"), Cell::new(0)),
            ..pipeline()
        };
        let cities = &p.cities.1;
        let geo = &p.geolocation.1;
        let cam = &p.camera.1;
        let orient = &p.orientation.1;
        let result = pollster::block_on(async {
            let mut bus = EventBus::new();
            p.run_stages(&mut bus).await
        });
        assert_eq!(
            result.unwrap_err(),
            SetupError::CameraDenied("NotAllowedError".to_string())
        );
        assert_eq!(
            (cities.get(), geo.get(), cam.get(), orient.get()),
            (1, 1, 1, 0)
        );
    }

    #[test]
    fn orientation_permission_outcomes() {
        let mut p = pipeline();
        p.orientation = FakeOrientation(Ok(PermissionState::Denied), Cell::new(0));
        let failure = run(p).unwrap_err();
        assert_eq!(failure.error, SetupError::OrientationDenied);
        assert!(failure.error.user_notice());

        let mut p = pipeline();
        p.orientation = FakeOrientation(Ok(PermissionState::Unsupported), Cell::new(0));
        assert_eq!(run(p).unwrap_err().error, SetupError::OrientationUnsupported);

        let mut p = pipeline();
        p.orientation = FakeOrientation(Err("NotAllowedError"), Cell::new(0));
        assert_eq!(
            run(p).unwrap_err().error,
            SetupError::OrientationRequestFailed("NotAllowedError".to_string())
        );

        let mut p = pipeline();
        p.orientation = FakeOrientation(Ok(PermissionState::Granted), Cell::new(0));
        assert!(run(p).is_ok());
    }

    #[test]
    fn invalid_position_is_treated_as_unavailable() {
        let mut p = pipeline();
        p.geolocation = FakeGeo(Ok(GeoPoint::new(f64::NAN, 0.0)), Cell::new(0));
        assert_eq!(run(p).unwrap_err().error, SetupError::GeolocationUnavailable);
    }

    #[test]
    fn failure_display_names_the_stage() {
        let failure = SetupFailure {
            error: SetupError::OrientationDenied,
            events: Vec::new(),
        };
        assert_eq!(
            failure.to_string(),
            "setup failed at orientation-permission: Permission denied for device orientation."
        );
    }
}
