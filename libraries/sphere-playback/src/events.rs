//! Session events
//!
//! Everything a session reports to its host is queued as a [`SessionEvent`]
//! and drained with [`PlaybackSession::drain_events`](crate::PlaybackSession::drain_events).
//! Events are emitted at key points:
//! - State changes (loading/playing/paused)
//! - Camera and video changes
//! - Fullscreen changes
//! - Access-required signals for placeholder slots
//! - Control-overlay commands
//! - Transient user messages

use crate::types::{PlaybackState, ViewAngles};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a placeholder slot cannot be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRequired {
    /// The viewer has to pay for this camera
    PaymentRequired,

    /// The camera is not available yet
    NotYetAvailable,
}

/// Commands for the control-overlay collaborator of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayCommand {
    /// Show until told otherwise
    Show,

    /// Show now and hide again after the delay
    ShowForced {
        /// Delay before the overlay hides itself
        hide_after: Duration,
    },

    /// Hide until a [`OverlayCommand::Restore`]
    Hide,

    /// Undo a previous [`OverlayCommand::Hide`]
    Restore,
}

/// Kind of a transient user-visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Playback failed; the viewer may try again
    PlaybackFailed,

    /// Platform cannot play adaptive streams at all
    Unsupported,
}

/// Short auto-dismissed message for the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl UserMessage {
    pub fn new(kind: MessageKind) -> Self {
        let text = match kind {
            MessageKind::PlaybackFailed => "Playback failed, please try again",
            MessageKind::Unsupported => "This browser cannot play this video",
        };
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Events emitted by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Coarse playback state changed
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// Active camera changed
    CameraChanged {
        video: usize,
        camera: usize,
    },

    /// Active video changed (camera resets to 0)
    VideoChanged {
        video: usize,
    },

    /// Fullscreen flag changed
    FullscreenChanged {
        fullscreen: bool,
    },

    /// A placeholder slot was requested; the host decides what to show
    AccessRequired {
        reason: AccessRequired,
        video: usize,
        camera: usize,
    },

    /// Command for this instance's control overlay
    Overlay(OverlayCommand),

    /// "Tap to play" affordance after a blocked autoplay
    TapToPlay {
        visible: bool,
    },

    /// Camera orientation applied after a switch or an explicit request
    AnglesApplied {
        angles: ViewAngles,
    },

    /// Transient message shown to the viewer
    Message(UserMessage),

    /// The transient message auto-dismissed
    MessageDismissed,

    /// Hard reload performed by the resume watchdog
    DecoderRecovered,
}
