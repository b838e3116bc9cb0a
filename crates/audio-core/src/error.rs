//! Error types for audio output

use thiserror::Error;

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur while producing a tone
#[derive(Debug, Error)]
pub enum AudioError {
    /// No usable output device
    #[error("no audio output device available")]
    DeviceUnavailable,

    /// The device exists but cannot play what we need
    #[error("audio output unsupported: {message}")]
    Unsupported { message: String },

    /// The device failed mid-flight
    #[error("audio playback failed: {message}")]
    PlaybackFailed { message: String },
}

impl AudioError {
    /// Create an unsupported-output error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create a playback failure error
    pub fn playback(message: impl Into<String>) -> Self {
        Self::PlaybackFailed {
            message: message.into(),
        }
    }
}
