//! Mock media and transport implementations
//!
//! Public so downstream crates can drive call sessions in their own tests
//! without a real peer connection or microphone.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use eresponde_store_core::{IceCandidateInit, SessionDescription};

use crate::error::{MediaError, TransportError};
use crate::negotiation::{
    ConnectionState, LocalTrack, MediaSource, PeerTransport, PeerTransportFactory, TransportEvent,
};

/// A [`MediaSource`] with a scriptable outcome and release tracking
#[derive(Default)]
pub struct MockMediaSource {
    failure: Mutex<Option<MediaError>>,
    acquired: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl MockMediaSource {
    /// Create a source whose acquisitions succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every acquisition fail with this error
    pub fn fail_with(&self, error: MediaError) {
        *self.failure.lock() = Some(error);
    }

    /// Make acquisitions succeed again
    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    /// How many tracks have been handed out
    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// How many tracks have been released
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Tracks handed out and not yet released
    pub fn live_tracks(&self) -> usize {
        self.acquired_count() - self.released_count()
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire(&self) -> Result<Box<dyn LocalTrack>, MediaError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockTrack {
            released: Arc::clone(&self.released),
            done: AtomicBool::new(false),
        }))
    }
}

struct MockTrack {
    released: Arc<AtomicUsize>,
    done: AtomicBool,
}

impl LocalTrack for MockTrack {
    fn release(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A recording [`PeerTransport`] with an injectable event stream
///
/// Rejects ICE candidates with an empty candidate string, so tests can
/// exercise the per-message error path.
pub struct MockPeerTransport {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    offers: AtomicUsize,
    remote_descriptions: Mutex<Vec<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidateInit>>,
    restarts: AtomicUsize,
    fail_restart: AtomicBool,
    closed: AtomicBool,
}

impl Default for MockPeerTransport {
    fn default() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            offers: AtomicUsize::new(0),
            remote_descriptions: Mutex::new(Vec::new()),
            candidates: Mutex::new(Vec::new()),
            restarts: AtomicUsize::new(0),
            fail_restart: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

impl MockPeerTransport {
    /// Create an open transport with an empty event stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a transport event
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Inject a discovered local candidate
    pub fn emit_local_candidate(&self, candidate: impl Into<String>) {
        self.emit(TransportEvent::LocalCandidate(IceCandidateInit {
            candidate: candidate.into(),
            sdp_mline_index: Some(0),
            sdp_mid: Some("0".into()),
        }));
    }

    /// Inject a connection-state change
    pub fn emit_connection_state(&self, state: ConnectionState) {
        self.emit(TransportEvent::ConnectionState(state));
    }

    /// Remote descriptions applied so far
    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote_descriptions.lock().clone()
    }

    /// Remote candidates accepted so far
    pub fn candidates(&self) -> Vec<IceCandidateInit> {
        self.candidates.lock().clone()
    }

    /// How many offers were created
    pub fn offer_count(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }

    /// How many ICE restarts were requested
    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Make every ICE restart fail
    pub fn fail_restarts(&self) {
        self.fail_restart.store(true, Ordering::SeqCst);
    }

    /// Whether the transport has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for MockPeerTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let n = self.offers.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::offer(format!(
            "v=0\r\no=- {n} 0 IN IP4 0.0.0.0\r\ns=mock\r\n"
        )))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.remote_descriptions.lock().push(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if candidate.candidate.is_empty() {
            return Err(TransportError::candidate_rejected("empty candidate string"));
        }
        self.candidates.lock().push(candidate);
        Ok(())
    }

    async fn restart_ice(&self) -> Result<(), TransportError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if self.fail_restart.load(Ordering::SeqCst) {
            return Err(TransportError::ice_restart_failed("scripted failure"));
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.lock().take()
    }
}

/// A [`PeerTransportFactory`] that keeps every transport it created
#[derive(Default)]
pub struct MockTransportFactory {
    created: Mutex<Vec<Arc<MockPeerTransport>>>,
}

impl MockTransportFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// How many transports have been created
    pub fn created(&self) -> usize {
        self.created.lock().len()
    }

    /// The most recently created transport
    pub fn last(&self) -> Option<Arc<MockPeerTransport>> {
        self.created.lock().last().cloned()
    }

    /// The transport created for the nth call
    pub fn transport(&self, index: usize) -> Option<Arc<MockPeerTransport>> {
        self.created.lock().get(index).cloned()
    }
}

impl PeerTransportFactory for MockTransportFactory {
    fn create(&self) -> Arc<dyn PeerTransport> {
        let transport = Arc::new(MockPeerTransport::new());
        self.created.lock().push(Arc::clone(&transport));
        transport
    }
}
