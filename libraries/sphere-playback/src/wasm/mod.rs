//! WASM bindings for sphere-playback
//!
//! Browser implementations of the platform traits (a `<video>` element,
//! hls.js, a JS scene bridge, body scroll locking) and JavaScript-friendly
//! wrappers around [`PlaybackSession`](crate::PlaybackSession) and
//! [`Coordinator`](crate::Coordinator).

pub mod hls;
pub mod media;
pub mod player;
pub mod scene;

pub use hls::HlsBackend;
pub use media::WebMediaElement;
pub use player::{WasmCoordinator, WasmPlayer};
pub use scene::{BodyScrollLock, JsScene};
