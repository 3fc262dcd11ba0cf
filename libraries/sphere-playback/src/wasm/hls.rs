//! hls.js as the adaptive-streaming client
//!
//! Expects the page to load hls.js so that a global `Hls` class exists.
//! Client events are tagged with their [`BindingId`] and queued for
//! [`WasmPlayer::tick`](super::WasmPlayer::tick).

use crate::element::{BindingId, StreamEvent, StreamingBackend, StreamingClient};
use crate::error::StreamErrorKind;
use js_sys::Reflect;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::HtmlMediaElement;

#[wasm_bindgen]
extern "C" {
    /// hls.js player instance
    pub type Hls;

    #[wasm_bindgen(constructor, catch)]
    fn new() -> Result<Hls, JsValue>;

    #[wasm_bindgen(static_method_of = Hls, js_name = isSupported, catch)]
    fn is_supported() -> Result<bool, JsValue>;

    #[wasm_bindgen(method, js_name = loadSource)]
    fn load_source(this: &Hls, url: &str);

    #[wasm_bindgen(method, js_name = attachMedia)]
    fn attach_media(this: &Hls, media: &HtmlMediaElement);

    #[wasm_bindgen(method, js_name = startLoad)]
    fn start_load(this: &Hls, start_position: f64);

    #[wasm_bindgen(method, js_name = recoverMediaError, catch)]
    fn recover_media_error(this: &Hls) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = detachMedia)]
    fn detach_media(this: &Hls);

    #[wasm_bindgen(method)]
    fn destroy(this: &Hls);

    #[wasm_bindgen(method)]
    fn on(this: &Hls, event: &str, callback: &Closure<dyn FnMut(JsValue, JsValue)>);
}

const MANIFEST_PARSED: &str = "hlsManifestParsed";
const FRAG_LOADED: &str = "hlsFragLoaded";
const ERROR: &str = "hlsError";

pub(crate) type StreamOutbox = Rc<RefCell<Vec<(BindingId, StreamEvent)>>>;

/// Creates one hls.js instance per binding
pub struct HlsBackend {
    media: HtmlMediaElement,
    outbox: StreamOutbox,
}

impl HlsBackend {
    pub fn new(media: HtmlMediaElement) -> Self {
        Self {
            media,
            outbox: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Take the queued client events
    pub fn take_events(&self) -> Vec<(BindingId, StreamEvent)> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }
}

impl StreamingBackend for HlsBackend {
    fn is_supported(&self) -> bool {
        let present = Reflect::has(&js_sys::global(), &JsValue::from_str("Hls")).unwrap_or(false);
        present && Hls::is_supported().unwrap_or(false)
    }

    fn create_client(&self, binding: BindingId) -> Box<dyn StreamingClient> {
        let hls = match Hls::new() {
            Ok(hls) => Some(hls),
            Err(error) => {
                warn!(?error, binding = binding.0, "Could not create hls.js instance");
                self.outbox.borrow_mut().push((
                    binding,
                    StreamEvent::Error {
                        kind: StreamErrorKind::Other,
                        fatal: true,
                        details: "hls.js instance could not be created".to_string(),
                    },
                ));
                None
            }
        };

        let mut listeners = Vec::new();
        if let Some(hls) = &hls {
            for name in [MANIFEST_PARSED, FRAG_LOADED, ERROR] {
                let outbox = self.outbox.clone();
                let closure = Closure::wrap(Box::new(move |_event: JsValue, data: JsValue| {
                    let event = match name {
                        MANIFEST_PARSED => StreamEvent::ManifestParsed,
                        FRAG_LOADED => StreamEvent::FragmentLoaded,
                        _ => parse_error(&data),
                    };
                    outbox.borrow_mut().push((binding, event));
                }) as Box<dyn FnMut(JsValue, JsValue)>);
                hls.on(name, &closure);
                listeners.push(closure);
            }
        }

        Box::new(HlsClient {
            hls,
            media: self.media.clone(),
            binding,
            listeners,
        })
    }
}

/// One hls.js instance bound to the decode element
struct HlsClient {
    hls: Option<Hls>,
    media: HtmlMediaElement,
    binding: BindingId,
    listeners: Vec<Closure<dyn FnMut(JsValue, JsValue)>>,
}

impl StreamingClient for HlsClient {
    fn load_source(&mut self, url: &str) {
        if let Some(hls) = &self.hls {
            hls.load_source(url);
        }
    }

    fn attach_media(&mut self) {
        if let Some(hls) = &self.hls {
            hls.attach_media(&self.media);
        }
    }

    fn start_load(&mut self, from: f64) {
        if let Some(hls) = &self.hls {
            hls.start_load(from);
        }
    }

    fn recover_media_error(&mut self) -> Result<(), String> {
        let hls = self.hls.as_ref().ok_or_else(|| "no hls.js instance".to_string())?;
        hls.recover_media_error()
            .map_err(|error| error.as_string().unwrap_or_else(|| format!("{error:?}")))
    }

    fn detach_media(&mut self) {
        if let Some(hls) = &self.hls {
            hls.detach_media();
        }
    }

    fn destroy(&mut self) {
        if let Some(hls) = self.hls.take() {
            debug!(binding = self.binding.0, "Destroying hls.js instance");
            hls.destroy();
        }
        self.listeners.clear();
    }
}

impl Drop for HlsClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// `{ type, fatal, details }` of an hls.js error event
fn parse_error(data: &JsValue) -> StreamEvent {
    let field = |name: &str| Reflect::get(data, &JsValue::from_str(name)).ok();
    let kind = match field("type").and_then(|value| value.as_string()).as_deref() {
        Some("networkError") => StreamErrorKind::Network,
        Some("mediaError") => StreamErrorKind::Decode,
        _ => StreamErrorKind::Other,
    };
    StreamEvent::Error {
        kind,
        fatal: field("fatal").and_then(|value| value.as_bool()).unwrap_or(false),
        details: field("details")
            .and_then(|value| value.as_string())
            .unwrap_or_default(),
    }
}
