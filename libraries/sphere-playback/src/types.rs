//! Core value types for immersive playback

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one mounted player instance
///
/// Used as the key in the page-wide [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap a host-supplied id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random id for hosts that do not supply one
    pub fn generate() -> Self {
        Self(format!("sphere-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Orbit camera orientation, in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewAngles {
    /// Horizontal rotation
    pub yaw: f64,

    /// Vertical rotation
    pub pitch: f64,

    /// Tilt
    pub roll: f64,
}

impl ViewAngles {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }
}

/// Camera field of view in degrees, always within [30, 120]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct FieldOfView(f64);

impl FieldOfView {
    /// Narrowest allowed zoom
    pub const MIN: f64 = 30.0;

    /// Widest allowed zoom
    pub const MAX: f64 = 120.0;

    /// Initial zoom of a fresh renderer
    pub const DEFAULT: f64 = 75.0;

    /// Create a field of view, clamping into the allowed range
    ///
    /// Non-finite input falls back to [`FieldOfView::DEFAULT`].
    pub fn new(degrees: f64) -> Self {
        if degrees.is_finite() {
            Self(degrees.clamp(Self::MIN, Self::MAX))
        } else {
            Self(Self::DEFAULT)
        }
    }

    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl Default for FieldOfView {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f64> for FieldOfView {
    fn from(degrees: f64) -> Self {
        Self::new(degrees)
    }
}

impl From<FieldOfView> for f64 {
    fn from(fov: FieldOfView) -> Self {
        fov.0
    }
}

/// Direction of a camera or video switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchDirection {
    /// One slot to the left (`-1`)
    Previous,

    /// One slot to the right (`+1`)
    Next,
}

impl SwitchDirection {
    /// Signed step: `-1` or `+1`
    pub fn step(self) -> i32 {
        match self {
            SwitchDirection::Previous => -1,
            SwitchDirection::Next => 1,
        }
    }

    /// Interpret a signed step from a host (`<0` previous, `>=0` next)
    pub fn from_step(step: i32) -> Self {
        if step < 0 {
            SwitchDirection::Previous
        } else {
            SwitchDirection::Next
        }
    }

    /// Advance `current` by one slot with wrap-around over `len` slots
    pub fn wrap(self, current: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match self {
            SwitchDirection::Previous => (current + len - 1) % len,
            SwitchDirection::Next => (current + 1) % len,
        }
    }
}

/// Either a flat list ("single-video mode") or a list of lists ("multi-video mode")
///
/// Used for camera URLs and for per-slot access flags, which share a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Matrix<T> {
    /// Ordered list of videos, each an ordered list of cameras
    Multi(Vec<Vec<T>>),

    /// Ordered list of cameras of the only video
    Single(Vec<T>),
}

impl<T> Matrix<T> {
    pub fn is_multi(&self) -> bool {
        matches!(self, Matrix::Multi(_))
    }

    /// Number of videos (1 in single-video mode)
    pub fn video_count(&self) -> usize {
        match self {
            Matrix::Multi(videos) => videos.len(),
            Matrix::Single(_) => 1,
        }
    }

    /// Cameras of a video
    pub fn video(&self, video: usize) -> Option<&[T]> {
        match self {
            Matrix::Multi(videos) => videos.get(video).map(Vec::as_slice),
            Matrix::Single(cameras) if video == 0 => Some(cameras.as_slice()),
            Matrix::Single(_) => None,
        }
    }

    /// Number of cameras of a video (0 when the video does not exist)
    pub fn camera_count(&self, video: usize) -> usize {
        self.video(video).map_or(0, <[T]>::len)
    }

    pub fn get(&self, video: usize, camera: usize) -> Option<&T> {
        self.video(video).and_then(|cameras| cameras.get(camera))
    }
}

/// Camera URLs; an empty string is a placeholder for a slot without access yet
pub type SourceMatrix = Matrix<String>;

impl SourceMatrix {
    /// Playable URL at a slot, or `None` for a placeholder or missing slot
    pub fn url(&self, video: usize, camera: usize) -> Option<&str> {
        self.get(video, camera)
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
    }
}

/// Snapshot taken immediately before a source swap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    /// Media time in seconds
    pub current_time: f64,

    /// Whether playback was running
    pub playing: bool,

    pub field_of_view: FieldOfView,

    /// `None` when the renderer had no camera yet
    pub view_angles: Option<ViewAngles>,
}

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing bound yet
    Idle,

    /// A source is bound and not yet ready to seek/play
    Loading,

    /// Ready and playing
    Playing,

    /// Ready and paused
    Paused,
}

/// Pixel size of a layout box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
