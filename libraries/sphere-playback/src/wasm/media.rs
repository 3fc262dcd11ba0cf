//! `<video>` element as a [`MediaElement`]
//!
//! DOM events and `play()` promise outcomes are queued on the element and
//! pumped into the session by [`WasmPlayer::tick`](super::WasmPlayer::tick).
//! Presented frames are counted through `requestVideoFrameCallback` where
//! the browser has it.

use crate::element::{CanPlay, MediaElement, MediaEvent, ReadyState};
use js_sys::{Function, Reflect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlVideoElement;

type Outbox = Rc<RefCell<Vec<MediaEvent>>>;
type FrameClosure = Closure<dyn FnMut(f64, JsValue)>;

const LISTENED: [&str; 4] = ["loadedmetadata", "canplay", "waiting", "error"];

/// Self-rescheduling `requestVideoFrameCallback` loop
struct FrameLoop {
    closure: RefCell<Option<FrameClosure>>,
    handle: Cell<Option<u32>>,
    frames: Cell<u32>,
}

impl FrameLoop {
    fn request(&self, video: &HtmlVideoElement) {
        let closure = self.closure.borrow();
        let Some(closure) = closure.as_ref() else {
            return;
        };
        let handle = call_video_method(video, "requestVideoFrameCallback", closure.as_ref())
            .ok()
            .and_then(|handle| handle.as_f64());
        self.handle.set(handle.map(|handle| handle as u32));
    }
}

/// Web decode element
pub struct WebMediaElement {
    video: HtmlVideoElement,
    outbox: Outbox,
    listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
    play_resolved: Closure<dyn FnMut(JsValue)>,
    play_rejected: Closure<dyn FnMut(JsValue)>,
    frame_loop: Option<Rc<FrameLoop>>,
}

impl WebMediaElement {
    /// Wrap a video element and start listening to it
    pub fn new(video: HtmlVideoElement) -> Result<Self, JsValue> {
        video.set_cross_origin(Some("anonymous"));
        video.set_attribute("playsinline", "true")?;

        let outbox: Outbox = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Vec::with_capacity(LISTENED.len());
        for name in LISTENED {
            let queue = outbox.clone();
            let target = video.clone();
            let closure = Closure::wrap(Box::new(move || {
                let event = match name {
                    "loadedmetadata" => MediaEvent::LoadedMetadata,
                    "canplay" => MediaEvent::CanPlay,
                    "waiting" => MediaEvent::Waiting,
                    _ => MediaEvent::Error(
                        target
                            .error()
                            .map(|error| format!("media error {}: {}", error.code(), error.message()))
                            .unwrap_or_else(|| "media error".to_string()),
                    ),
                };
                queue.borrow_mut().push(event);
            }) as Box<dyn FnMut()>);
            video.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
            listeners.push((name, closure));
        }

        let queue = outbox.clone();
        let play_resolved = Closure::wrap(Box::new(move |_: JsValue| {
            queue.borrow_mut().push(MediaEvent::PlayStarted);
        }) as Box<dyn FnMut(JsValue)>);
        let queue = outbox.clone();
        let play_rejected = Closure::wrap(Box::new(move |reason: JsValue| {
            let name = Reflect::get(&reason, &JsValue::from_str("name"))
                .ok()
                .and_then(|name| name.as_string())
                .unwrap_or_default();
            debug!(name = name.as_str(), "play() rejected");
            if let Some(event) = MediaEvent::from_play_rejection(&name) {
                queue.borrow_mut().push(event);
            }
        }) as Box<dyn FnMut(JsValue)>);

        let mut element = Self {
            video,
            outbox,
            listeners,
            play_resolved,
            play_rejected,
            frame_loop: None,
        };
        element.start_frame_loop();
        Ok(element)
    }

    fn start_frame_loop(&mut self) {
        if !self.supports_frame_callbacks() {
            return;
        }
        let frame_loop = Rc::new(FrameLoop {
            closure: RefCell::new(None),
            handle: Cell::new(None),
            frames: Cell::new(0),
        });

        let weak = Rc::downgrade(&frame_loop);
        let video = self.video.clone();
        let closure = Closure::wrap(Box::new(move |_now: f64, _metadata: JsValue| {
            if let Some(frame_loop) = weak.upgrade() {
                frame_loop.frames.set(frame_loop.frames.get().saturating_add(1));
                frame_loop.request(&video);
            }
        }) as Box<dyn FnMut(f64, JsValue)>);
        *frame_loop.closure.borrow_mut() = Some(closure);
        frame_loop.request(&self.video);
        self.frame_loop = Some(frame_loop);
    }

    /// Take the queued element events
    pub fn take_events(&self) -> Vec<MediaEvent> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    /// Take the number of frames presented since the last call
    pub fn take_frames(&self) -> u32 {
        self.frame_loop
            .as_ref()
            .map_or(0, |frame_loop| frame_loop.frames.replace(0))
    }

    pub fn video(&self) -> &HtmlVideoElement {
        &self.video
    }
}

impl MediaElement for WebMediaElement {
    fn set_src(&self, url: Option<&str>) {
        match url {
            Some(url) => self.video.set_src(url),
            None => {
                if let Err(error) = self.video.remove_attribute("src") {
                    warn!(?error, "Could not remove video src");
                }
            }
        }
    }

    fn load(&self) {
        self.video.load();
    }

    fn play(&self) {
        match self.video.play() {
            Ok(promise) => {
                // The returned promise only mirrors the outcome
                let _ = promise.then2(&self.play_resolved, &self.play_rejected);
            }
            Err(error) => {
                debug!(?error, "play() threw");
                self.outbox.borrow_mut().push(MediaEvent::PlayRejected);
            }
        }
    }

    fn pause(&self) {
        if let Err(error) = self.video.pause() {
            warn!(?error, "pause() threw");
        }
    }

    fn is_paused(&self) -> bool {
        self.video.paused()
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn set_current_time(&self, seconds: f64) {
        self.video.set_current_time(seconds);
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_level(self.video.ready_state())
    }

    fn can_play_type(&self, mime: &str) -> CanPlay {
        CanPlay::from_answer(&self.video.can_play_type(mime))
    }

    fn supports_frame_callbacks(&self) -> bool {
        Reflect::has(&self.video, &JsValue::from_str("requestVideoFrameCallback")).unwrap_or(false)
    }
}

impl Drop for WebMediaElement {
    fn drop(&mut self) {
        for (name, closure) in &self.listeners {
            let _ = self
                .video
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
        if let Some(frame_loop) = self.frame_loop.take() {
            if let Some(handle) = frame_loop.handle.take() {
                let _ = call_video_method(
                    &self.video,
                    "cancelVideoFrameCallback",
                    &JsValue::from(handle),
                );
            }
            frame_loop.closure.borrow_mut().take();
        }
    }
}

/// Call an optional method of the video element by name
fn call_video_method(video: &HtmlVideoElement, name: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(video, &JsValue::from_str(name))?.dyn_into()?;
    method.call1(video, arg)
}
