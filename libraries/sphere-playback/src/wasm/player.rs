//! WASM-compatible session and coordinator wrappers

use super::hls::HlsBackend;
use super::media::WebMediaElement;
use super::scene::{BodyScrollLock, JsScene};
use crate::{
    AccessRequired, BindingId, Coordinator, PlatformHints, PlaybackSession, PlaybackState,
    PlayerConfig, PlayerError, PointerInput, PointerPhase, SessionEvent, SessionPlatform, Size,
    StreamErrorKind, StreamEvent, SwitchDirection, SwitchOutcome,
};
use js_sys::Function;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;
use wasm_bindgen::prelude::*;
use web_sys::HtmlVideoElement;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;
}

/// Host time for the engine
fn now() -> Duration {
    let millis = performance_now();
    if millis.is_finite() && millis > 0.0 {
        Duration::from_secs_f64(millis / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn to_js(error: PlayerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Page-wide registry shared by every player on the page
#[wasm_bindgen]
#[derive(Default)]
pub struct WasmCoordinator {
    inner: Rc<Coordinator>,
}

#[wasm_bindgen]
impl WasmCoordinator {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self::default()
    }

    /// Pause every player except `id`
    #[wasm_bindgen(js_name = pauseAllExcept)]
    pub fn pause_all_except(&self, id: &str) {
        self.inner.pause_all_except(&id.into());
    }

    /// Instance id of the fullscreen player, if any
    #[wasm_bindgen(js_name = fullscreenInstance)]
    pub fn fullscreen_instance(&self) -> Option<String> {
        self.inner
            .fullscreen_instance()
            .map(|id| id.as_str().to_string())
    }

    /// Number of mounted players
    #[wasm_bindgen(getter)]
    pub fn size(&self) -> usize {
        self.inner.len()
    }
}

/// One player bound to a `<video>` element and a JS scene
#[wasm_bindgen]
pub struct WasmPlayer {
    inner: PlaybackSession,
    media: Rc<WebMediaElement>,
    streaming: Rc<HlsBackend>,

    // Event callbacks
    on_fullscreen_change: Option<Function>,
    on_access_required: Option<Function>,
    on_event: Option<Function>,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Mount a player
    ///
    /// `config` is a plain object in the `PlayerConfig` shape; `scene` is the
    /// scene bridge object.
    #[wasm_bindgen(constructor)]
    pub fn new(
        coordinator: &WasmCoordinator,
        video: HtmlVideoElement,
        scene: JsValue,
        config: JsValue,
    ) -> Result<WasmPlayer, JsValue> {
        console_error_panic_hook::set_once();

        let config: PlayerConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid player config: {}", e)))?;
        let hints = web_sys::window()
            .and_then(|window| window.navigator().user_agent().ok())
            .map(|user_agent| PlatformHints::from_user_agent(&user_agent))
            .unwrap_or_default();

        let media = Rc::new(WebMediaElement::new(video.clone())?);
        let streaming = Rc::new(HlsBackend::new(video.into()));
        let platform = SessionPlatform {
            element: media.clone(),
            streaming: Some(streaming.clone()),
            scene: Box::new(JsScene::new(scene)),
            page: Some(Box::new(BodyScrollLock::default())),
            hints,
        };
        let inner = PlaybackSession::mount(config, platform, coordinator.inner.clone(), now())
            .map_err(to_js)?;

        Ok(Self {
            inner,
            media,
            streaming,
            on_fullscreen_change: None,
            on_access_required: None,
            on_event: None,
        })
    }

    // ===== Playback Control =====

    #[wasm_bindgen(js_name = togglePlayPause)]
    pub fn toggle_play_pause(&mut self) -> Result<(), JsValue> {
        let result = self.inner.toggle_play_pause(now()).map_err(to_js);
        self.flush_events();
        result
    }

    /// Returns the new fullscreen flag
    #[wasm_bindgen(js_name = toggleFullscreen)]
    pub fn toggle_fullscreen(&mut self) -> Result<bool, JsValue> {
        let result = self.inner.toggle_fullscreen(now()).map_err(to_js);
        self.flush_events();
        result
    }

    /// Switch camera by `step` (`-1` left, `+1` right); returns whether it switched
    #[wasm_bindgen(js_name = switchCamera)]
    pub fn switch_camera(&mut self, step: i32) -> Result<bool, JsValue> {
        let result = self
            .inner
            .switch_camera(SwitchDirection::from_step(step), now())
            .map(|outcome| matches!(outcome, SwitchOutcome::Switched { .. }))
            .map_err(to_js);
        self.flush_events();
        result
    }

    /// Switch video by `step` (multi-video mode); returns whether it switched
    #[wasm_bindgen(js_name = switchVideo)]
    pub fn switch_video(&mut self, step: i32) -> Result<bool, JsValue> {
        let result = self
            .inner
            .switch_video(SwitchDirection::from_step(step), now())
            .map(|outcome| matches!(outcome, SwitchOutcome::Switched { .. }))
            .map_err(to_js);
        self.flush_events();
        result
    }

    // ===== View =====

    /// Orient the camera (radians)
    #[wasm_bindgen(js_name = setViewAngles)]
    pub fn set_view_angles(&mut self, yaw: f64, pitch: f64, roll: f64) {
        self.inner.set_view_angles(yaw, pitch, roll, now());
        self.flush_events();
    }

    /// `{ yaw, pitch, roll }` or `null` before the camera exists
    #[wasm_bindgen(js_name = getCurrentAngles)]
    pub fn get_current_angles(&self) -> JsValue {
        self.inner
            .current_angles()
            .and_then(|angles| serde_wasm_bindgen::to_value(&angles).ok())
            .unwrap_or(JsValue::NULL)
    }

    /// Set the zoom; returns the clamped value in degrees
    #[wasm_bindgen(js_name = setFieldOfView)]
    pub fn set_field_of_view(&mut self, degrees: f64) -> f64 {
        self.inner.set_field_of_view(degrees).degrees()
    }

    #[wasm_bindgen(js_name = getFieldOfView)]
    pub fn get_field_of_view(&self) -> f64 {
        self.inner.field_of_view().degrees()
    }

    /// Container resized; returns `[width, height]` of the viewport
    pub fn resize(&mut self, width: f64, height: f64) -> Vec<f64> {
        let viewport = self.inner.resize(Size::new(width, height));
        vec![viewport.width, viewport.height]
    }

    // ===== Platform Events =====

    /// Pump queued element and client events and fire due timers
    ///
    /// Call from `requestAnimationFrame` or a short interval.
    pub fn tick(&mut self) {
        let now = now();
        for event in self.media.take_events() {
            self.inner.handle_media_event(event, now);
        }
        for _ in 0..self.media.take_frames() {
            self.inner.on_frame_presented();
        }
        for (binding, event) in self.streaming.take_events() {
            self.inner.handle_stream_event(binding, event, now);
        }
        self.inner.tick(now);
        self.flush_events();
    }

    #[wasm_bindgen(js_name = onVisibilityChange)]
    pub fn on_visibility_change(&mut self, visible: bool) {
        self.inner.on_visibility_change(visible, now());
        self.flush_events();
    }

    /// Pointer input; `phase` is "down", "move", "up" or "cancel"
    #[wasm_bindgen(js_name = handlePointer)]
    pub fn handle_pointer(&mut self, id: u32, phase: &str, x: f64, y: f64) -> Result<(), JsValue> {
        let phase = match phase {
            "down" => PointerPhase::Down,
            "move" => PointerPhase::Move,
            "up" => PointerPhase::Up,
            "cancel" => PointerPhase::Cancel,
            _ => return Err(JsValue::from_str("Invalid pointer phase. Use 'down', 'move', 'up' or 'cancel'")),
        };
        self.inner.handle_pointer(PointerInput::new(id, phase, x, y), now());
        self.flush_events();
        Ok(())
    }

    /// Forward a stream event from a custom client integration
    #[wasm_bindgen(js_name = handleStreamError)]
    pub fn handle_stream_error(&mut self, binding: u32, kind: &str, fatal: bool, details: String) {
        let kind = match kind {
            "networkError" => StreamErrorKind::Network,
            "mediaError" => StreamErrorKind::Decode,
            _ => StreamErrorKind::Other,
        };
        self.inner.handle_stream_event(
            BindingId(u64::from(binding)),
            StreamEvent::Error { kind, fatal, details },
            now(),
        );
        self.flush_events();
    }

    #[wasm_bindgen(js_name = onContextLost)]
    pub fn on_context_lost(&mut self) {
        self.inner.on_context_lost();
    }

    #[wasm_bindgen(js_name = onContextRestored)]
    pub fn on_context_restored(&mut self) {
        self.inner.on_context_restored();
    }

    /// Tear the player down; safe to call more than once
    pub fn unmount(&mut self) {
        self.inner.unmount();
        self.flush_events();
    }

    // ===== State Queries =====

    #[wasm_bindgen(js_name = instanceId)]
    pub fn instance_id(&self) -> String {
        self.inner.instance_id().as_str().to_string()
    }

    /// Current playback state as string
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        match self.inner.state() {
            PlaybackState::Idle => "idle".to_string(),
            PlaybackState::Loading => "loading".to_string(),
            PlaybackState::Playing => "playing".to_string(),
            PlaybackState::Paused => "paused".to_string(),
        }
    }

    #[wasm_bindgen(js_name = currentVideo)]
    pub fn current_video(&self) -> usize {
        self.inner.current_video()
    }

    #[wasm_bindgen(js_name = currentCamera)]
    pub fn current_camera(&self) -> usize {
        self.inner.current_camera()
    }

    #[wasm_bindgen(js_name = isFullscreen)]
    pub fn is_fullscreen(&self) -> bool {
        self.inner.is_fullscreen()
    }

    #[wasm_bindgen(js_name = isUiVisible)]
    pub fn is_ui_visible(&self) -> bool {
        self.inner.is_ui_visible()
    }

    // ===== Event Listeners =====

    /// Register fullscreen change callback: `(fullscreen: boolean) => void`
    #[wasm_bindgen(js_name = onFullscreenChange)]
    pub fn on_fullscreen_change(&mut self, callback: Function) {
        self.on_fullscreen_change = Some(callback);
    }

    /// Register access-required callback: `(reason, video, camera) => void`
    ///
    /// `reason` is "paymentRequired" or "notYetAvailable".
    #[wasm_bindgen(js_name = onAccessRequired)]
    pub fn on_access_required(&mut self, callback: Function) {
        self.on_access_required = Some(callback);
    }

    /// Register a callback receiving every session event as an object
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&mut self, callback: Function) {
        self.on_event = Some(callback);
    }

    // ===== Internal Event Emitters =====

    fn flush_events(&mut self) {
        for event in self.inner.drain_events() {
            match &event {
                SessionEvent::FullscreenChanged { fullscreen } => {
                    if let Some(ref cb) = self.on_fullscreen_change {
                        report(cb.call1(&JsValue::NULL, &JsValue::from_bool(*fullscreen)));
                    }
                }
                SessionEvent::AccessRequired {
                    reason,
                    video,
                    camera,
                } => {
                    if let Some(ref cb) = self.on_access_required {
                        let reason = match reason {
                            AccessRequired::PaymentRequired => "paymentRequired",
                            AccessRequired::NotYetAvailable => "notYetAvailable",
                        };
                        report(cb.call3(
                            &JsValue::NULL,
                            &JsValue::from_str(reason),
                            &JsValue::from(*video as u32),
                            &JsValue::from(*camera as u32),
                        ));
                    }
                }
                _ => {}
            }

            if let Some(ref cb) = self.on_event {
                if let Ok(js_event) = serde_wasm_bindgen::to_value(&event) {
                    report(cb.call1(&JsValue::NULL, &js_event));
                }
            }
        }
    }
}

/// Host callbacks must not take the player down with them
fn report(result: Result<JsValue, JsValue>) {
    if let Err(error) = result {
        warn!(?error, "Host callback threw");
    }
}
