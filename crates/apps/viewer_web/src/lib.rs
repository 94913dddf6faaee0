use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use js_sys::{Function, Promise, Reflect};
use std::cell::RefCell;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{DeviceOrientationEvent, HtmlVideoElement, MediaStream, MediaStreamConstraints};

use foundation::GeoPoint;
use layers::{CompassConfig, LabelFrame, OffsetMode, Viewport};
use runtime::{
    CameraProvider, CitySource, EventKind, GeolocationError, GeolocationProvider,
    OrientationPermission, OrientationReading, PermissionState, Session, SetupPipeline,
};

const OVERLAY_ID: &str = "overlay";
const VIDEO_ID: &str = "camera-feed";
const LABEL_CLASS: &str = "city-label";

#[derive(Debug, Default)]
pub struct ViewerState {
    pub config: CompassConfig,
    pub session: Option<Session>,
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState::default());
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

fn log_error(msg: &str) {
    web_sys::console::error_1(&JsValue::from_str(msg));
}

fn notify_user(msg: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(msg);
    }
}

fn js_err(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

fn viewport() -> Viewport {
    let Some(window) = web_sys::window() else {
        return Viewport::new(0.0, 0.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    Viewport::new(w, h)
}

struct FetchCities {
    url: String,
}

impl CitySource for FetchCities {
    async fn fetch_cities(&self) -> Result<String, String> {
        let resp = Request::get(&self.url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(format!("HTTP {} for {}", resp.status(), self.url));
        }
        resp.text().await.map_err(|e| e.to_string())
    }
}

struct BrowserGeolocation;

impl GeolocationProvider for BrowserGeolocation {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        let geolocation = web_sys::window()
            .map(|w| w.navigator())
            .and_then(|n| n.geolocation().ok())
            .ok_or(GeolocationError::Unsupported)?;

        let promise = Promise::new(&mut |resolve, reject| {
            let reject_now = reject.clone();
            let on_ok = Closure::once_into_js(move |pos: JsValue| {
                let _ = resolve.call1(&JsValue::NULL, &pos);
            });
            let on_err = Closure::once_into_js(move |err: JsValue| {
                let _ = reject.call1(&JsValue::NULL, &err);
            });
            if let Err(e) = geolocation.get_current_position_with_error_callback(
                on_ok.unchecked_ref(),
                Some(on_err.unchecked_ref()),
            ) {
                log_error(&format!("getCurrentPosition threw: {}", js_err(e.clone())));
                // Neither callback will fire; settle the promise here.
                let _ = reject_now.call1(&JsValue::NULL, &e);
            }
        });

        let position = JsFuture::from(promise).await.map_err(|err| {
            let code = Reflect::get(&err, &JsValue::from_str("code"))
                .ok()
                .and_then(|c| c.as_f64());
            GeolocationError::from_reported_code(code)
        })?;

        let coords = Reflect::get(&position, &JsValue::from_str("coords"))
            .map_err(|_| GeolocationError::PositionUnavailable)?;
        let field = |name: &str| {
            Reflect::get(&coords, &JsValue::from_str(name))
                .ok()
                .and_then(|v| v.as_f64())
                .ok_or(GeolocationError::PositionUnavailable)
        };
        Ok(GeoPoint::new(field("latitude")?, field("longitude")?))
    }
}

struct BrowserCamera {
    video_id: &'static str,
}

impl CameraProvider for BrowserCamera {
    async fn open_environment_camera(&self) -> Result<(), String> {
        let window = web_sys::window().ok_or("no window")?;
        let media = window
            .navigator()
            .media_devices()
            .map_err(|e| format!("mediaDevices unavailable: {}", js_err(e)))?;

        let video = js_sys::Object::new();
        Reflect::set(
            &video,
            &JsValue::from_str("facingMode"),
            &JsValue::from_str("environment"),
        )
        .map_err(js_err)?;
        let constraints = MediaStreamConstraints::new();
        Reflect::set(&constraints, &JsValue::from_str("video"), &video).map_err(js_err)?;

        let stream = JsFuture::from(
            media
                .get_user_media_with_constraints(&constraints)
                .map_err(js_err)?,
        )
        .await
        .map_err(js_err)?;
        let stream: MediaStream = stream.dyn_into().map_err(js_err)?;

        let element = window
            .document()
            .and_then(|d| d.get_element_by_id(self.video_id))
            .ok_or_else(|| format!("missing #{} element", self.video_id))?;
        let element: HtmlVideoElement = element.dyn_into().map_err(|_| "not a <video>")?;
        element.set_src_object(Some(&stream));
        JsFuture::from(element.play().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        Ok(())
    }
}

struct BrowserOrientation;

impl OrientationPermission for BrowserOrientation {
    async fn request(&self) -> Result<PermissionState, String> {
        let window = web_sys::window().ok_or("no window")?;
        let ctor = Reflect::get(&window, &JsValue::from_str("DeviceOrientationEvent"))
            .map_err(js_err)?;
        if ctor.is_undefined() {
            return Ok(PermissionState::Unsupported);
        }

        // iOS gates orientation events behind an explicit request.
        let request = Reflect::get(&ctor, &JsValue::from_str("requestPermission"))
            .map_err(js_err)?;
        let Some(request) = request.dyn_ref::<Function>() else {
            return Ok(PermissionState::NotRequired);
        };

        let promise: Promise = request.call0(&ctor).map_err(js_err)?.dyn_into().map_err(js_err)?;
        let answer = JsFuture::from(promise).await.map_err(js_err)?;
        if answer.as_string().as_deref() == Some("granted") {
            Ok(PermissionState::Granted)
        } else {
            Ok(PermissionState::Denied)
        }
    }
}

fn render_labels(frame: &LabelFrame) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let overlay = document
        .get_element_by_id(OVERLAY_ID)
        .ok_or_else(|| JsValue::from_str("missing #overlay"))?;

    overlay.set_inner_html("");
    for label in &frame.labels {
        let el = document.create_element("div")?;
        el.set_class_name(LABEL_CLASS);
        el.set_attribute("style", &format!("left: {}px; top: 50%;", label.x_px))?;
        el.set_text_content(Some(&label.text));
        overlay.append_child(&el)?;
    }
    Ok(())
}

fn on_device_orientation(event: DeviceOrientationEvent) {
    let compass = Reflect::get(&event, &JsValue::from_str("webkitCompassHeading"))
        .ok()
        .and_then(|v| v.as_f64());
    let reading = OrientationReading {
        compass_heading_deg: compass,
        alpha_deg: event.alpha(),
    };
    if compass.is_none() && reading.alpha_deg.is_none() {
        web_sys::console::warn_1(&JsValue::from_str("Alpha (compass heading) is null."));
    }

    let viewport = viewport();
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        let Some(session) = s.session.as_mut() else {
            return;
        };
        if let Some(frame) = session.on_orientation(reading, viewport)
            && let Err(err) = render_labels(frame)
        {
            log_error(&format!("label render failed: {}", js_err(err)));
        }
    });
}

fn attach_orientation_listener() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let handler = Closure::<dyn FnMut(DeviceOrientationEvent)>::new(on_device_orientation);
    window.add_event_listener_with_callback_and_bool(
        "deviceorientation",
        handler.as_ref().unchecked_ref(),
        true,
    )?;
    // Lives for the rest of the page.
    handler.forget();
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Overrides the viewing cone before (or after) `launch`.
#[wasm_bindgen]
pub fn configure(threshold_deg: f64, spread_deg: f64, legacy_offsets: bool) -> Result<(), JsValue> {
    let config = CompassConfig {
        threshold_deg,
        spread_deg,
        offset_mode: if legacy_offsets {
            OffsetMode::Wrapped
        } else {
            OffsetMode::Signed
        },
    };
    apply_config(config)
}

/// Same as `configure`, from a JSON object such as `{"threshold_deg": 20}`.
#[wasm_bindgen]
pub fn configure_json(json: &str) -> Result<(), JsValue> {
    let config: CompassConfig =
        serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    apply_config(config)
}

fn apply_config(config: CompassConfig) -> Result<(), JsValue> {
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        if let Some(session) = s.session.as_mut() {
            session
                .set_config(config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
        }
        s.config = config;
        Ok(())
    })
}

/// Runs the one-shot setup chain, then starts tracking orientation.
#[wasm_bindgen]
pub fn launch(cities_url: String) {
    spawn_local(async move {
        let config = STATE.with(|state| state.borrow().config);
        let pipeline = SetupPipeline {
            cities: FetchCities { url: cities_url },
            geolocation: BrowserGeolocation,
            camera: BrowserCamera { video_id: VIDEO_ID },
            orientation: BrowserOrientation,
            config,
        };

        match pipeline.run().await {
            Ok(done) => {
                for event in &done.events {
                    log(&format!("[{}] {}", event.stage.name(), event.message));
                }
                STATE.with(|state| state.borrow_mut().session = Some(done.session));
                if let Err(err) = attach_orientation_listener() {
                    log_error(&format!("orientation listener failed: {}", js_err(err)));
                }
            }
            Err(failure) => {
                for event in &failure.events {
                    if event.kind != EventKind::Failed {
                        log(&format!("[{}] {}", event.stage.name(), event.message));
                    }
                }
                log_error(&failure.to_string());
                if failure.error.user_notice() {
                    notify_user(&failure.error.to_string());
                }
            }
        }
    });
}

/// Number of labels currently shown, for page scripts and debugging.
#[wasm_bindgen]
pub fn visible_label_count() -> usize {
    STATE.with(|state| {
        state
            .borrow()
            .session
            .as_ref()
            .and_then(|s| s.last_frame())
            .map_or(0, |f| f.len())
    })
}
