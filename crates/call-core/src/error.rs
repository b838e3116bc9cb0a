//! Error types for the call layer
//!
//! The taxonomy separates failures by how the dashboard must react:
//! [`MediaError`] aborts a call before anything is acquired and is shown to
//! the operator verbatim; [`TransportError`] and store failures are
//! best-effort while the session stays viable; protocol violations are
//! caught per message; concurrency-policy violations are rejected
//! synchronously with a typed variant.

use thiserror::Error;

use eresponde_store_core::StoreError;

/// Result type for call operations
pub type CallResult<T> = Result<T, CallError>;

/// Local audio capture failures, each user-facing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The operator denied (or revoked) microphone permission
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No audio input device is available
    #[error("no audio input device available")]
    NoDevice,

    /// The host cannot capture audio in a usable format
    #[error("audio capture unsupported: {message}")]
    Unsupported { message: String },

    /// Capture started and then failed
    #[error("audio capture failed: {message}")]
    Failed { message: String },
}

impl MediaError {
    /// Create an unsupported-capture error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create a capture failure error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Peer-transport failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport could not produce an offer
    #[error("offer creation failed: {message}")]
    OfferFailed { message: String },

    /// The transport rejected a remote session description
    #[error("remote description rejected: {message}")]
    RemoteDescriptionRejected { message: String },

    /// The transport rejected an ICE candidate
    #[error("ice candidate rejected: {message}")]
    CandidateRejected { message: String },

    /// An ICE restart could not be performed
    #[error("ice restart failed: {message}")]
    IceRestartFailed { message: String },

    /// The transport is already closed
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Create an offer failure error
    pub fn offer_failed(message: impl Into<String>) -> Self {
        Self::OfferFailed {
            message: message.into(),
        }
    }

    /// Create a remote description rejection error
    pub fn remote_description_rejected(message: impl Into<String>) -> Self {
        Self::RemoteDescriptionRejected {
            message: message.into(),
        }
    }

    /// Create a candidate rejection error
    pub fn candidate_rejected(message: impl Into<String>) -> Self {
        Self::CandidateRejected {
            message: message.into(),
        }
    }

    /// Create an ICE restart failure error
    pub fn ice_restart_failed(message: impl Into<String>) -> Self {
        Self::IceRestartFailed {
            message: message.into(),
        }
    }
}

/// Errors surfaced by call sessions and the call manager
#[derive(Debug, Error)]
pub enum CallError {
    /// A non-terminal call session already exists
    #[error("a call is already in progress (call {call_id})")]
    AlreadyInProgress { call_id: String },

    /// The dialed civilian has no account record
    #[error("no account found for target '{uid}'")]
    UnknownTarget { uid: String },

    /// Local media acquisition failed; nothing was set up
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The peer transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A shared-store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote side sent something the protocol does not allow
    #[error("protocol violation: {message}")]
    Protocol { message: String },
}

impl CallError {
    /// Create a protocol violation error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
