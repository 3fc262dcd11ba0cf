//! Error types for immersive playback

use thiserror::Error;

/// Class of a streaming failure reported by the adaptive-streaming client
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StreamErrorKind {
    /// Segment/manifest fetch failure
    Network,

    /// Decoder/media pipeline failure
    Decode,

    /// Anything else (key system, mux, internal)
    Other,
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Neither native nor client-side adaptive streaming is available
    #[error("Adaptive streaming is not supported on this platform")]
    UnsupportedPlatform,

    /// Source matrix has no videos or a video has no cameras
    #[error("Source matrix is empty")]
    EmptySourceMatrix,

    /// Video/camera pair does not address a slot
    #[error("Invalid source index: video {video}, camera {camera}")]
    InvalidIndex { video: usize, camera: usize },

    /// Video switching requested in single-video mode
    #[error("Video switching requires multi-video mode")]
    NotMultiVideo,

    /// Unrecoverable streaming error
    #[error("Streaming error ({0:?}): {1}")]
    Stream(StreamErrorKind, String),

    /// Local recovery attempt failed
    #[error("Recovery failed: {0}")]
    Recovery(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Operation on a session that has already been torn down
    #[error("Session has been unmounted")]
    Unmounted,

    /// Configuration JSON could not be parsed
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;
