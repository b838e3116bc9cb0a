//! Caller-side live call sessions for the operations dashboard
//!
//! Dialing a civilian negotiates a peer-to-peer audio stream with their
//! mobile client, using the shared store as the signaling relay: the caller
//! publishes an offer and its ICE candidates into per-call mailboxes, the
//! mobile side answers through the same store, and both sides update the
//! `voip_calls/{callId}` record as the call progresses.
//!
//! ```text
//! CallManager ──► NegotiationEngine ──► PeerTransport / MediaSource (seams)
//!      │
//!      └──► SignalingChannel ──► SharedStore ◄── remote mobile client
//! ```
//!
//! The peer connection and microphone are traits ([`PeerTransport`],
//! [`MediaSource`]); [`testing`] provides recording mocks for both.

pub mod error;
pub mod events;
pub mod negotiation;
pub mod session;
pub mod signaling;
pub mod testing;
pub mod tones;

pub use error::{CallError, CallResult, MediaError, TransportError};
pub use events::{CallEvent, EndReason};
pub use negotiation::{
    ConnectionState, LocalTrack, MediaSource, NegotiationEngine, PeerTransport,
    PeerTransportFactory, TransportEvent,
};
pub use session::{CallConfig, CallId, CallManager, CallState};
pub use signaling::{AnswerWatch, CandidateWatch, Role, SignalingChannel};
pub use tones::CallTones;
