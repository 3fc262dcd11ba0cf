//! Platform profile
//!
//! Computed once per session. Capability probes decide everything a platform
//! can answer for itself; the few behaviours no API exposes come from
//! [`PlatformHints`], the only place user-agent heuristics live.

use crate::element::{CanPlay, MediaElement, StreamingBackend};
use serde::{Deserialize, Serialize};

/// MIME type of adaptive (HLS) manifests
pub const ADAPTIVE_MIME: &str = "application/vnd.apple.mpegurl";

/// How sources are bound to the decode element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamingPath {
    /// The native decoder understands adaptive manifests
    Native,

    /// An adaptive-streaming client feeds segments
    Client,

    /// Neither is available
    Unsupported,
}

/// Platform quirks that cannot be probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformHints {
    /// Playback must start inside a fullscreen gesture
    pub fullscreen_gesture_required: bool,

    /// Video may freeze (audio running) after returning from background
    pub decoder_recovery_on_resume: bool,

    /// The video texture silently stops updating after a suspend
    pub texture_refresh_on_resume: bool,
}

impl PlatformHints {
    /// Heuristic hints from a user-agent string
    pub fn from_user_agent(user_agent: &str) -> Self {
        let phone = user_agent.contains("iPhone") || user_agent.contains("iPod");
        let ios = phone || user_agent.contains("iPad");
        let safari = user_agent.contains("Safari")
            && !user_agent.contains("Chrome")
            && !user_agent.contains("Android");

        Self {
            fullscreen_gesture_required: phone,
            decoder_recovery_on_resume: ios || safari,
            texture_refresh_on_resume: ios,
        }
    }
}

/// Everything a session needs to know about its platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub streaming: StreamingPath,

    /// Per-frame presentation callbacks are available
    pub frame_callbacks: bool,

    pub fullscreen_gesture_required: bool,

    pub decoder_recovery_on_resume: bool,

    pub texture_refresh_on_resume: bool,
}

impl PlatformProfile {
    /// Probe the element and streaming backend once
    pub fn probe(
        element: &dyn MediaElement,
        backend: Option<&dyn StreamingBackend>,
        hints: PlatformHints,
    ) -> Self {
        let streaming = if element.can_play_type(ADAPTIVE_MIME) != CanPlay::No {
            StreamingPath::Native
        } else if backend.is_some_and(|backend| backend.is_supported()) {
            StreamingPath::Client
        } else {
            StreamingPath::Unsupported
        };

        let profile = Self {
            streaming,
            frame_callbacks: element.supports_frame_callbacks(),
            fullscreen_gesture_required: hints.fullscreen_gesture_required,
            decoder_recovery_on_resume: hints.decoder_recovery_on_resume,
            texture_refresh_on_resume: hints.texture_refresh_on_resume,
        };
        tracing::debug!(?profile, "Platform profile probed");
        profile
    }
}
