//! Media and peer-connection negotiation
//!
//! The peer connection and local audio capture are platform seams: the
//! engine drives them through the [`PeerTransport`] and [`MediaSource`]
//! traits and owns the ordering rules around them. Local media is acquired
//! before anything else so a denied microphone leaves no half-initialized
//! session behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use eresponde_store_core::{IceCandidateInit, SessionDescription};

use crate::error::{CallError, CallResult, MediaError, TransportError};

/// Peer-connection states, in the standard wire spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{label}")
    }
}

/// Events pushed up by a [`PeerTransport`]
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local ICE candidate was discovered and must be relayed
    LocalCandidate(IceCandidateInit),
    /// The remote audio track arrived
    RemoteTrack,
    /// The connection state changed
    ConnectionState(ConnectionState),
}

/// A live local capture resource
pub trait LocalTrack: Send + Sync {
    /// Release the underlying device; idempotent
    fn release(&self);
}

/// Local audio capture seam
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire the microphone; on failure nothing is held
    async fn acquire(&self) -> Result<Box<dyn LocalTrack>, MediaError>;
}

/// Peer-connection seam
///
/// One transport per call; implementations push [`TransportEvent`]s into the
/// receiver handed out by [`PeerTransport::take_events`].
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Produce the local offer
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    /// Apply the remote session description
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Add one remote ICE candidate; duplicates are a no-op
    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), TransportError>;

    /// Restart ICE gathering on the existing connection
    async fn restart_ice(&self) -> Result<(), TransportError>;

    /// Tear the connection down; idempotent
    async fn close(&self);

    /// Take the event receiver; `None` after the first call
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;
}

/// Creates one [`PeerTransport`] per call
pub trait PeerTransportFactory: Send + Sync {
    fn create(&self) -> Arc<dyn PeerTransport>;
}

/// Drives one call's media and peer connection
///
/// Owns the local track and the transport for exactly one session. ICE
/// restart is attempted at most once per session, best-effort; a remote
/// payload the transport rejects is logged and dropped without touching the
/// rest of the session.
pub struct NegotiationEngine {
    transport: Arc<dyn PeerTransport>,
    media: Mutex<Option<Box<dyn LocalTrack>>>,
    restart_attempted: AtomicBool,
    closed: AtomicBool,
}

impl NegotiationEngine {
    /// Acquire media, then a transport
    ///
    /// Media comes first: when acquisition fails no transport has been
    /// created and there is nothing to release.
    pub async fn acquire(
        source: &dyn MediaSource,
        transports: &dyn PeerTransportFactory,
    ) -> Result<Self, MediaError> {
        let media = source.acquire().await?;
        debug!("local media acquired");
        Ok(Self {
            transport: transports.create(),
            media: Mutex::new(Some(media)),
            restart_attempted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Produce the local offer
    pub async fn create_offer(&self) -> CallResult<SessionDescription> {
        Ok(self.transport.create_offer().await?)
    }

    /// Apply the remote answer
    ///
    /// A payload of the wrong type is a per-message protocol error; the
    /// session stays up and a later well-formed answer is still accepted.
    pub async fn apply_remote_answer(&self, answer: SessionDescription) -> CallResult<()> {
        if answer.kind != "answer" {
            return Err(CallError::protocol(format!(
                "expected an answer description, got '{}'",
                answer.kind
            )));
        }
        self.transport.set_remote_description(answer).await?;
        Ok(())
    }

    /// Feed one remote candidate to the transport
    ///
    /// One rejected candidate never aborts the session; the transport
    /// treats duplicates as a no-op.
    pub async fn add_remote_candidate(&self, candidate: IceCandidateInit) {
        if let Err(error) = self.transport.add_ice_candidate(candidate).await {
            warn!(%error, "remote candidate rejected");
        }
    }

    /// React to a connection-state change
    ///
    /// `failed` and `disconnected` trigger one ICE restart for the lifetime
    /// of the session; further drops are left to the remote end or the
    /// operator hanging up.
    pub async fn on_connection_state(&self, state: ConnectionState) {
        if !matches!(
            state,
            ConnectionState::Failed | ConnectionState::Disconnected
        ) {
            return;
        }
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.restart_attempted.swap(true, Ordering::SeqCst) {
            debug!(%state, "ice restart already attempted for this session");
            return;
        }
        info!(%state, "attempting ice restart");
        if let Err(error) = self.transport.restart_ice().await {
            warn!(%error, "ice restart failed");
        }
    }

    /// Take the transport's event receiver; `None` after the first call
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.transport.take_events()
    }

    /// Release local media and close the transport; idempotent
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let media = self.media.lock().take();
        if let Some(media) = media {
            media.release();
        }
        self.transport.close().await;
        debug!("negotiation engine closed");
    }

    /// Whether [`NegotiationEngine::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
