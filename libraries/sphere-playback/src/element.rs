//! Platform seams for decoding and adaptive streaming
//!
//! The engine never talks to a browser or OS media stack directly. Hosts
//! implement these traits (see the `wasm` module for the web-sys versions)
//! and deliver asynchronous outcomes back as [`MediaEvent`]s and
//! [`StreamEvent`]s.

use crate::error::StreamErrorKind;
use serde::{Deserialize, Serialize};

/// How much media data the decode element has
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Map the numeric `readyState` of a media element
    pub fn from_level(level: u16) -> Self {
        match level {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }

    /// Current frame data is available
    pub fn is_readable(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// Answer of a `canPlayType`-style capability query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanPlay {
    No,
    Maybe,
    Probably,
}

impl CanPlay {
    /// Map the string answer of `canPlayType`
    pub fn from_answer(answer: &str) -> Self {
        match answer {
            "probably" => CanPlay::Probably,
            "maybe" => CanPlay::Maybe,
            _ => CanPlay::No,
        }
    }
}

/// The platform's media-playback primitive
///
/// Methods take `&self`: the element is shared between the session, the
/// coordinator's control handle and the renderer's texture.
pub trait MediaElement {
    /// Assign (`Some`) or remove (`None`) the native source URL
    fn set_src(&self, url: Option<&str>);

    /// Restart resource selection after `set_src`
    fn load(&self);

    /// Request playback; the outcome arrives as [`MediaEvent::PlayStarted`]
    /// or [`MediaEvent::PlayRejected`]
    fn play(&self);

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Media time in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    fn ready_state(&self) -> ReadyState;

    /// Capability probe, e.g. for `application/vnd.apple.mpegurl`
    fn can_play_type(&self, mime: &str) -> CanPlay;

    /// Whether per-frame presentation callbacks are available
    fn supports_frame_callbacks(&self) -> bool;
}

/// Identifies one streaming-client binding so late events can be discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub u64);

/// Adaptive-streaming client bound to the session's decode element
pub trait StreamingClient {
    fn load_source(&mut self, url: &str);

    /// Attach to the decode element the backend was created for
    fn attach_media(&mut self);

    /// Start (or restart) segment loading at `from` seconds
    fn start_load(&mut self, from: f64);

    /// Reset decoder state after a decode-class error
    fn recover_media_error(&mut self) -> std::result::Result<(), String>;

    fn detach_media(&mut self);

    /// Release every resource; the client is not used afterwards
    fn destroy(&mut self);
}

/// Factory for streaming clients
pub trait StreamingBackend {
    /// Whether client-side adaptive streaming works on this platform
    fn is_supported(&self) -> bool;

    /// Create a client whose events will be tagged with `binding`
    fn create_client(&self, binding: BindingId) -> Box<dyn StreamingClient>;
}

/// Events from the decode element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Duration and dimensions known; the element can seek
    LoadedMetadata,

    /// Enough data to start playback
    CanPlay,

    /// A `play()` request resolved
    PlayStarted,

    /// The platform refused a `play()` request (autoplay policy)
    PlayRejected,

    /// The element stopped for lack of data
    Waiting,

    /// The element reported a media error
    Error(String),
}

impl MediaEvent {
    /// Event for a rejected `play()` promise, by the rejection's error name
    ///
    /// Only `NotAllowedError` is a policy block. An `AbortError` follows a
    /// `pause()` or a source change and means nothing to the session.
    pub fn from_play_rejection(name: &str) -> Option<Self> {
        (name == "NotAllowedError").then_some(MediaEvent::PlayRejected)
    }
}

/// Events from the streaming client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Manifest loaded and parsed
    ManifestParsed,

    /// A media segment arrived
    FragmentLoaded,

    /// Client error
    Error {
        kind: StreamErrorKind,
        fatal: bool,
        details: String,
    },
}
