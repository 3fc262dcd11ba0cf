//! JavaScript-side 3D scene and page effects
//!
//! The scene object is duck-typed; it must provide:
//!
//! ```text
//! isCameraReady() -> bool
//! getCameraAngles() -> { yaw, pitch, roll } | null
//! setCameraAngles(yaw, pitch, roll)
//! setFieldOfView(degrees)
//! updateProjectionMatrix()
//! setOrbitEnabled(enabled)
//! orbitDrag(dx, dy)
//! rebuildVideoTexture()
//! resize(width, height)
//! ```
//!
//! A missing or throwing method is logged and otherwise ignored.

use crate::renderer::SceneBackend;
use crate::session::PageEffects;
use crate::types::{Size, ViewAngles};
use js_sys::{Array, Function, Reflect};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Scene bridge backed by a JS object
pub struct JsScene {
    bridge: JsValue,
}

impl JsScene {
    pub fn new(bridge: JsValue) -> Self {
        Self { bridge }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let function = Reflect::get(&self.bridge, &JsValue::from_str(method))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok());
        let Some(function) = function else {
            warn!(method, "Scene bridge method missing");
            return None;
        };
        let args: Array = args.iter().collect();
        match function.apply(&self.bridge, &args) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(method, ?error, "Scene bridge call failed");
                None
            }
        }
    }
}

impl SceneBackend for JsScene {
    fn is_camera_ready(&self) -> bool {
        self.call("isCameraReady", &[])
            .and_then(|ready| ready.as_bool())
            .unwrap_or(false)
    }

    fn camera_angles(&self) -> Option<ViewAngles> {
        let angles = self.call("getCameraAngles", &[])?;
        if angles.is_null() || angles.is_undefined() {
            return None;
        }
        let component = |name: &str| {
            Reflect::get(&angles, &JsValue::from_str(name))
                .ok()
                .and_then(|value| value.as_f64())
        };
        Some(ViewAngles::new(
            component("yaw")?,
            component("pitch").unwrap_or(0.0),
            component("roll").unwrap_or(0.0),
        ))
    }

    fn set_camera_angles(&mut self, angles: ViewAngles) {
        self.call(
            "setCameraAngles",
            &[angles.yaw.into(), angles.pitch.into(), angles.roll.into()],
        );
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.call("setFieldOfView", &[degrees.into()]);
    }

    fn update_projection(&mut self) {
        self.call("updateProjectionMatrix", &[]);
    }

    fn set_orbit_enabled(&mut self, enabled: bool) {
        self.call("setOrbitEnabled", &[enabled.into()]);
    }

    fn orbit_drag(&mut self, dx: f64, dy: f64) {
        self.call("orbitDrag", &[dx.into(), dy.into()]);
    }

    fn rebuild_video_texture(&mut self) {
        self.call("rebuildVideoTexture", &[]);
    }

    fn resize(&mut self, viewport: Size) {
        self.call("resize", &[viewport.width.into(), viewport.height.into()]);
    }
}

/// Locks page scrolling through `document.body.style.overflow`
#[derive(Default)]
pub struct BodyScrollLock {
    previous: Option<String>,
}

impl BodyScrollLock {
    fn body_style() -> Option<web_sys::CssStyleDeclaration> {
        Some(web_sys::window()?.document()?.body()?.style())
    }
}

impl PageEffects for BodyScrollLock {
    fn lock_scroll(&mut self) {
        let Some(style) = Self::body_style() else {
            return;
        };
        if self.previous.is_none() {
            self.previous = Some(style.get_property_value("overflow").unwrap_or_default());
        }
        if let Err(error) = style.set_property("overflow", "hidden") {
            warn!(?error, "Could not lock page scroll");
        }
    }

    fn unlock_scroll(&mut self) {
        let (Some(style), Some(previous)) = (Self::body_style(), self.previous.take()) else {
            return;
        };
        if let Err(error) = style.set_property("overflow", &previous) {
            warn!(?error, "Could not unlock page scroll");
        }
    }
}
