//! Session configuration
//!
//! Field names are camelCase so a JavaScript host can hand over a plain
//! object unchanged.

use crate::error::{PlayerError, Result};
use crate::types::{InstanceId, Matrix, SourceMatrix};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing constants of the engine
///
/// All values are configurable; the defaults are the ones the player ships with.
/// Durations are plain millisecond numbers in the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingConfig {
    /// Overlay auto-hide delay while embedded (default: 2 s)
    #[serde(with = "millis")]
    pub auto_hide_embedded: Duration,

    /// Overlay auto-hide delay while fullscreen (default: 3 s)
    #[serde(with = "millis")]
    pub auto_hide_fullscreen: Duration,

    /// Delay between camera orientation attempts (default: 100 ms)
    #[serde(with = "millis")]
    pub angle_retry_interval: Duration,

    /// Maximum camera orientation attempts per request (default: 10)
    pub angle_retry_max_attempts: u32,

    /// Resume watchdog observation window (default: 800 ms)
    #[serde(with = "millis")]
    pub watchdog_window: Duration,

    /// Period of the stuck-pinch safety check (default: 3 s)
    #[serde(with = "millis")]
    pub gesture_safety_interval: Duration,

    /// Delay before the orbit controller is re-enabled after a pinch (default: 300 ms)
    #[serde(with = "millis")]
    pub gesture_settle: Duration,

    /// Lifetime of a transient user message (default: 3 s)
    #[serde(with = "millis")]
    pub message_dismiss: Duration,

    /// Distance change in pixels before two pointers count as a pinch (default: 12)
    pub pinch_activation_px: f64,

    /// Longest press still classified as a tap (default: 250 ms)
    #[serde(with = "millis")]
    pub tap_max_duration: Duration,

    /// Largest pointer travel in pixels still classified as a tap (default: 10)
    pub tap_max_movement_px: f64,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: u64 = Deserialize::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            auto_hide_embedded: Duration::from_secs(2),
            auto_hide_fullscreen: Duration::from_secs(3),
            angle_retry_interval: Duration::from_millis(100),
            angle_retry_max_attempts: 10,
            watchdog_window: Duration::from_millis(800),
            gesture_safety_interval: Duration::from_secs(3),
            gesture_settle: Duration::from_millis(300),
            message_dismiss: Duration::from_secs(3),
            pinch_activation_px: 12.0,
            tap_max_duration: Duration::from_millis(250),
            tap_max_movement_px: 10.0,
        }
    }
}

impl TimingConfig {
    /// Overlay auto-hide delay for the given display mode
    pub fn auto_hide(&self, fullscreen: bool) -> Duration {
        if fullscreen {
            self.auto_hide_fullscreen
        } else {
            self.auto_hide_embedded
        }
    }
}

/// Configuration of one player instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Registry key; generated when absent
    #[serde(default)]
    pub instance_id: Option<InstanceId>,

    /// Start in fullscreen
    #[serde(default)]
    pub fullscreen: bool,

    /// Camera URLs: flat list or list of lists; `""` marks a slot without access
    pub sources: SourceMatrix,

    #[serde(default)]
    pub initial_video: usize,

    #[serde(default)]
    pub initial_camera: usize,

    /// Initial yaw in degrees
    #[serde(default)]
    pub initial_yaw: Option<f64>,

    #[serde(default = "default_true")]
    pub show_controls: bool,

    #[serde(default = "default_true")]
    pub show_switcher: bool,

    #[serde(default)]
    pub autoplay: bool,

    /// Pause every other registered instance when this one starts playing
    #[serde(default = "default_true")]
    pub pause_others_on_play: bool,

    /// Per-slot "payment required" flags, same shape as `sources`
    #[serde(default)]
    pub needs_payment: Option<Matrix<bool>>,

    /// Per-slot "waiting for availability" flags, same shape as `sources`
    ///
    /// Informational: an unflagged placeholder already reports "not yet
    /// available", so only `needs_payment` changes the raised signal.
    #[serde(default)]
    pub awaiting_availability: Option<Matrix<bool>>,

    /// Width / height ratio forced while embedded (default: 16:9)
    #[serde(default = "default_aspect_ratio")]
    pub embedded_aspect_ratio: f64,

    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_true() -> bool {
    true
}

fn default_aspect_ratio() -> f64 {
    16.0 / 9.0
}

impl PlayerConfig {
    /// Config with default options for the given sources
    pub fn new(sources: SourceMatrix) -> Self {
        Self {
            instance_id: None,
            fullscreen: false,
            sources,
            initial_video: 0,
            initial_camera: 0,
            initial_yaw: None,
            show_controls: true,
            show_switcher: true,
            autoplay: false,
            pause_others_on_play: true,
            needs_payment: None,
            awaiting_availability: None,
            embedded_aspect_ratio: default_aspect_ratio(),
            timing: TimingConfig::default(),
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check shape and index consistency
    pub fn validate(&self) -> Result<()> {
        let videos = self.sources.video_count();
        if videos == 0 {
            return Err(PlayerError::EmptySourceMatrix);
        }
        if (0..videos).any(|v| self.sources.camera_count(v) == 0) {
            return Err(PlayerError::EmptySourceMatrix);
        }
        if self.initial_video >= videos
            || self.initial_camera >= self.sources.camera_count(self.initial_video)
        {
            return Err(PlayerError::InvalidIndex {
                video: self.initial_video,
                camera: self.initial_camera,
            });
        }
        for (name, flags) in [
            ("needsPayment", &self.needs_payment),
            ("awaitingAvailability", &self.awaiting_availability),
        ] {
            if let Some(flags) = flags {
                let same_shape = flags.is_multi() == self.sources.is_multi()
                    && flags.video_count() == videos
                    && (0..videos).all(|v| flags.camera_count(v) == self.sources.camera_count(v));
                if !same_shape {
                    return Err(PlayerError::Config(format!(
                        "{name} must have the same shape as sources"
                    )));
                }
            }
        }
        if !(self.embedded_aspect_ratio.is_finite() && self.embedded_aspect_ratio > 0.0) {
            return Err(PlayerError::Config(
                "embeddedAspectRatio must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a slot is flagged as needing payment
    pub fn slot_needs_payment(&self, video: usize, camera: usize) -> bool {
        flag(self.needs_payment.as_ref(), video, camera)
    }

    /// Whether a slot is flagged as waiting for availability
    pub fn slot_awaiting_availability(&self, video: usize, camera: usize) -> bool {
        flag(self.awaiting_availability.as_ref(), video, camera)
    }
}

fn flag(flags: Option<&Matrix<bool>>, video: usize, camera: usize) -> bool {
    flags
        .and_then(|flags| flags.get(video, camera))
        .copied()
        .unwrap_or(false)
}
