//! Sphere Player - Immersive Playback Engine
//!
//! Platform-agnostic playback engine for 360° multi-camera video.
//!
//! This crate provides:
//! - Per-instance playback sessions (play/pause, loading, fullscreen, overlay)
//! - Camera and video switching that keeps time, play state and zoom
//! - Angle continuity: the view keeps pointing at the same spot across a camera switch
//! - Adaptive-stream binding (native or through a streaming client) with local recovery
//! - Page-wide coordination: one instance plays, one instance is fullscreen
//! - Orbit-drag vs. pinch-zoom gesture disambiguation
//! - A resume watchdog that reloads video frozen after backgrounding
//!
//! # Architecture
//!
//! `sphere-playback` owns policy, not pixels or decoders:
//! - The decode element, streaming client, 3D scene and page are traits
//! - Time is passed in by the host; timers fire from [`PlaybackSession::tick`]
//! - Notifications are queued and drained with [`PlaybackSession::drain_events`]
//! - Everything is single-threaded; shared state uses `Rc`/`RefCell`
//!
//! Browser bindings live behind the `wasm` feature.
//!
//! # Example: Configuration
//!
//! ```rust
//! use sphere_playback::PlayerConfig;
//!
//! let config = PlayerConfig::from_json(
//!     r#"{
//!         "sources": ["https://cdn.example.com/cam-a.m3u8", "", "https://cdn.example.com/cam-c.m3u8"],
//!         "needsPayment": [false, true, false],
//!         "initialYaw": 90
//!     }"#,
//! )
//! .unwrap();
//!
//! assert!(!config.sources.is_multi());
//! assert_eq!(config.sources.url(0, 1), None);
//! assert!(config.slot_needs_payment(0, 1));
//! ```
//!
//! # Example: Angle Continuity
//!
//! ```rust
//! use sphere_playback::angle::continued_yaw_radians;
//! use sphere_playback::SwitchDirection;
//!
//! let yaw = 1.2;
//! let right = continued_yaw_radians(yaw, SwitchDirection::Next);
//! let back = continued_yaw_radians(right, SwitchDirection::Previous);
//! assert!((back - yaw).abs() < 1e-9);
//! ```

pub mod angle;
mod config;
mod coordinator;
mod element;
mod error;
mod events;
mod gesture;
mod platform;
mod renderer;
mod session;
mod source;
mod timers;
pub mod types;
mod watchdog;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
pub use config::{PlayerConfig, TimingConfig};
pub use coordinator::{ControlHandle, Coordinator};
pub use element::{
    BindingId, CanPlay, MediaElement, MediaEvent, ReadyState, StreamEvent, StreamingBackend,
    StreamingClient,
};
pub use error::{PlayerError, Result, StreamErrorKind};
pub use events::{AccessRequired, MessageKind, OverlayCommand, SessionEvent, UserMessage};
pub use gesture::{
    GestureAction, GestureController, GestureState, PointerInput, PointerPhase,
};
pub use platform::{PlatformHints, PlatformProfile, StreamingPath, ADAPTIVE_MIME};
pub use renderer::{OrientOutcome, SceneBackend, SphereMesh, SphericalRenderer};
pub use session::{PageEffects, PlaybackSession, SessionPlatform, SwitchOutcome};
pub use source::{LoadOptions, SourceController, SourceSignal, SourceStatus};
pub use timers::{TimerKind, TimerQueue};
pub use types::{
    FieldOfView, InstanceId, Matrix, PlaybackState, SavedState, Size, SourceMatrix,
    SwitchDirection, ViewAngles,
};
pub use watchdog::{ResumeWatchdog, WatchdogVerdict};
