//! Call lifecycle events
//!
//! Broadcast to whoever renders the call UI; the manager sends best-effort
//! and never blocks on a slow or absent subscriber.

use crate::session::{CallId, CallState};

/// Why a call reached `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The operator hung up (or a setup step failed locally)
    Hangup,
    /// The remote side declined the call
    RemoteRejected,
    /// The remote side hung up
    RemoteEnded,
    /// The remote side never answered
    RemoteMissed,
}

/// Events emitted by the call manager
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The session moved to a new state
    StateChanged { call_id: CallId, state: CallState },
    /// The remote audio track arrived
    RemoteTrack { call_id: CallId },
    /// The session ended
    Ended { call_id: CallId, reason: EndReason },
}
