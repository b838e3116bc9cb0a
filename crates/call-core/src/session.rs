//! Call sessions and the caller-side manager
//!
//! One manager per dashboard instance, at most one live session at a time.
//! The session is a one-way state machine, `Idle → Dialing → Ringing →
//! Connected → Ended`, with `Ended` terminal; a fresh call after `Ended`
//! gets a brand-new [`CallId`] and brand-new mailboxes.
//!
//! Teardown discipline: every listener and task belonging to a call is
//! registered on that call's session, `end()` executes every cleanup step
//! even when an earlier one fails, and every spawned continuation re-checks
//! that its call is still the manager's current session before touching
//! shared state. The store is multi-writer, so both sides may race on the
//! call record; all record writes are idempotent.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use eresponde_audio_core::AudioSink;
use eresponde_store_core::{
    now_iso8601, path, CallRecord, CallStatus, CivilianAccount, Participant, SharedStore,
};

use crate::error::{CallError, CallResult};
use crate::events::{CallEvent, EndReason};
use crate::negotiation::{
    ConnectionState, MediaSource, NegotiationEngine, PeerTransportFactory, TransportEvent,
};
use crate::signaling::{AnswerWatch, CandidateWatch, Role, SignalingChannel};
use crate::tones::CallTones;

/// The dashboard is always the offering side.
const LOCAL_ROLE: Role = Role::Caller;

/// Identifier of one call, shared with the remote client through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(Uuid);

impl CallId {
    /// Generate a fresh call id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Dialing,
    Ringing,
    Connected,
    Ended,
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CallState::Idle => "idle",
            CallState::Dialing => "dialing",
            CallState::Ringing => "ringing",
            CallState::Connected => "connected",
            CallState::Ended => "ended",
        };
        write!(f, "{label}")
    }
}

/// Static configuration of the call manager
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Identity written as the `caller` side of every call record
    pub operator: Participant,
    /// After this long the signaling listeners of a still-live session are
    /// force-detached; the answer and candidate mailboxes are only useful
    /// during setup
    pub safety_timeout: Duration,
}

impl CallConfig {
    /// Configuration with the default 30 s safety timeout
    pub fn new(operator: Participant) -> Self {
        Self {
            operator,
            safety_timeout: Duration::from_secs(30),
        }
    }

    /// Override the safety timeout
    pub fn with_safety_timeout(mut self, timeout: Duration) -> Self {
        self.safety_timeout = timeout;
        self
    }
}

/// Tasks belonging to one session, named so signaling listeners can be
/// detached separately from the rest
#[derive(Default)]
struct CallTasks {
    transport: Option<JoinHandle<()>>,
    answer: Option<JoinHandle<()>>,
    candidates: Option<JoinHandle<()>>,
    status: Option<JoinHandle<()>>,
    safety: Option<JoinHandle<()>>,
}

impl CallTasks {
    /// Abort the answer and candidate pumps; their subscriptions drop with
    /// them, releasing the store listeners
    fn abort_signaling(&mut self) {
        for task in [self.answer.take(), self.candidates.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }

    fn abort_all(&mut self) {
        self.abort_signaling();
        for task in [self.transport.take(), self.status.take(), self.safety.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

struct ActiveCall {
    call_id: CallId,
    state: CallState,
    engine: Arc<NegotiationEngine>,
    tones: Arc<CallTones>,
    tasks: CallTasks,
}

struct Inner {
    store: Arc<dyn SharedStore>,
    media: Arc<dyn MediaSource>,
    transports: Arc<dyn PeerTransportFactory>,
    sink: Arc<dyn AudioSink>,
    config: CallConfig,
    active: Mutex<Option<ActiveCall>>,
    /// Serializes `start()` so two dials can never interleave their setup
    start_gate: tokio::sync::Mutex<()>,
    events: broadcast::Sender<CallEvent>,
}

/// Owns the single live call session of one dashboard instance
#[derive(Clone)]
pub struct CallManager {
    inner: Arc<Inner>,
}

impl CallManager {
    /// Create an idle manager
    pub fn new(
        store: Arc<dyn SharedStore>,
        media: Arc<dyn MediaSource>,
        transports: Arc<dyn PeerTransportFactory>,
        sink: Arc<dyn AudioSink>,
        config: CallConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                store,
                media,
                transports,
                sink,
                config,
                active: Mutex::new(None),
                start_gate: tokio::sync::Mutex::new(()),
                events,
            }),
        }
    }

    /// Subscribe to call lifecycle events
    pub fn subscribe_events(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.events.subscribe()
    }

    /// The current session state; `Idle` when no session exists
    pub fn state(&self) -> CallState {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|call| call.state)
            .unwrap_or(CallState::Idle)
    }

    /// The current session's call id, including an ended one
    pub fn active_call_id(&self) -> Option<CallId> {
        self.inner.active.lock().as_ref().map(|call| call.call_id)
    }

    /// Dial a civilian by account uid
    ///
    /// Rejected while a non-terminal session exists. The target is resolved
    /// before anything is acquired, and media is acquired before the
    /// transport, so every early failure leaves zero partial state.
    pub async fn start(&self, target_uid: &str) -> CallResult<CallId> {
        let _gate = self.inner.start_gate.lock().await;

        if let Some(call) = self.inner.active.lock().as_ref() {
            if call.state != CallState::Ended {
                return Err(CallError::AlreadyInProgress {
                    call_id: call.call_id.to_string(),
                });
            }
        }

        // Resolve the callee before acquiring anything.
        let account = self
            .inner
            .store
            .read(&path::civilian_account(target_uid))
            .await?;
        let Some(account) = account else {
            return Err(CallError::UnknownTarget {
                uid: target_uid.to_string(),
            });
        };
        let callee_name = serde_json::from_value::<CivilianAccount>(account)
            .ok()
            .and_then(|account| account.display_label())
            .unwrap_or_else(|| target_uid.to_string());

        let engine = Arc::new(
            NegotiationEngine::acquire(
                self.inner.media.as_ref(),
                self.inner.transports.as_ref(),
            )
            .await?,
        );

        let call_id = CallId::new();
        let tones = Arc::new(CallTones::new(Arc::clone(&self.inner.sink)));
        let signaling = SignalingChannel::new(Arc::clone(&self.inner.store), call_id);
        info!(%call_id, target = target_uid, callee = %callee_name, "dialing");

        *self.inner.active.lock() = Some(ActiveCall {
            call_id,
            state: CallState::Dialing,
            engine: Arc::clone(&engine),
            tones: Arc::clone(&tones),
            tasks: CallTasks::default(),
        });
        self.emit(CallEvent::StateChanged {
            call_id,
            state: CallState::Dialing,
        });

        if let Err(error) = self.dial(call_id, target_uid, callee_name, &engine, &signaling).await {
            self.abort_setup(call_id).await;
            return Err(error);
        }

        // Ringing: ringback plus the listeners that drive the rest of the
        // session.
        self.set_state(call_id, CallState::Ringing);
        tones.start_ring();
        self.emit(CallEvent::StateChanged {
            call_id,
            state: CallState::Ringing,
        });

        let subscriptions = match self.subscribe_session(&signaling, call_id) {
            Ok(subscriptions) => subscriptions,
            Err(error) => {
                self.abort_setup(call_id).await;
                return Err(error);
            }
        };
        self.spawn_session_tasks(call_id, engine, signaling, subscriptions);

        Ok(call_id)
    }

    /// Offer, call record: the steps of `Dialing` that can fail
    async fn dial(
        &self,
        call_id: CallId,
        target_uid: &str,
        callee_name: String,
        engine: &NegotiationEngine,
        signaling: &SignalingChannel,
    ) -> CallResult<()> {
        let offer = engine.create_offer().await?;
        signaling.publish_offer(&offer).await?;

        let record = CallRecord {
            caller: self.inner.config.operator.clone(),
            callee: Participant {
                user_id: target_uid.to_string(),
                user_type: "civilian".to_string(),
                name: callee_name,
            },
            status: CallStatus::Ringing,
            created_at: now_iso8601(),
            answered_at: None,
            ended_at: None,
            report_id: None,
        };
        let record = serde_json::to_value(&record)
            .map_err(|error| CallError::protocol(error.to_string()))?;
        self.inner
            .store
            .write(&path::voip_call(&call_id.to_string()), record)
            .await?;
        Ok(())
    }

    fn subscribe_session(
        &self,
        signaling: &SignalingChannel,
        call_id: CallId,
    ) -> CallResult<SessionSubscriptions> {
        Ok(SessionSubscriptions {
            answer: signaling.watch_answer()?,
            candidates: signaling.watch_candidates(LOCAL_ROLE.remote())?,
            status: self
                .inner
                .store
                .subscribe_value(&path::voip_call(&call_id.to_string()))?,
        })
    }

    fn spawn_session_tasks(
        &self,
        call_id: CallId,
        engine: Arc<NegotiationEngine>,
        signaling: SignalingChannel,
        subscriptions: SessionSubscriptions,
    ) {
        let mut tasks = CallTasks::default();
        if let Some(events) = engine.take_events() {
            tasks.transport = Some(tokio::spawn(Self::pump_transport_events(
                self.clone(),
                call_id,
                Arc::clone(&engine),
                signaling,
                events,
            )));
        }
        tasks.answer = Some(tokio::spawn(Self::pump_answer(
            self.clone(),
            call_id,
            engine,
            subscriptions.answer,
        )));
        tasks.candidates = Some(tokio::spawn(Self::pump_remote_candidates(
            self.clone(),
            call_id,
            subscriptions.candidates,
        )));
        tasks.status = Some(tokio::spawn(Self::pump_call_status(
            self.clone(),
            call_id,
            subscriptions.status,
        )));
        tasks.safety = Some(tokio::spawn(Self::enforce_safety_timeout(
            self.clone(),
            call_id,
            self.inner.config.safety_timeout,
        )));

        // The session may already have ended while the tasks were being
        // spawned; in that case they must not outlive it.
        let mut active = self.inner.active.lock();
        match active.as_mut() {
            Some(call) if call.call_id == call_id && call.state != CallState::Ended => {
                call.tasks = tasks;
            }
            _ => tasks.abort_all(),
        }
    }

    async fn pump_transport_events(
        manager: CallManager,
        call_id: CallId,
        engine: Arc<NegotiationEngine>,
        signaling: SignalingChannel,
        mut events: tokio::sync::mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::LocalCandidate(candidate) => {
                    if let Err(error) = signaling.publish_candidate(LOCAL_ROLE, &candidate).await
                    {
                        warn!(%call_id, %error, "could not publish local candidate");
                    }
                }
                TransportEvent::RemoteTrack => {
                    manager.emit(CallEvent::RemoteTrack { call_id });
                    manager.mark_connected(call_id).await;
                }
                TransportEvent::ConnectionState(state) => {
                    debug!(%call_id, %state, "connection state changed");
                    if state == ConnectionState::Connected {
                        manager.mark_connected(call_id).await;
                    }
                    engine.on_connection_state(state).await;
                }
            }
        }
    }

    async fn pump_answer(
        manager: CallManager,
        call_id: CallId,
        engine: Arc<NegotiationEngine>,
        mut answers: AnswerWatch,
    ) {
        while let Some(answer) = answers.recv().await {
            match engine.apply_remote_answer(answer).await {
                Ok(()) => manager.mark_connected(call_id).await,
                Err(error) => warn!(%call_id, %error, "remote answer rejected"),
            }
        }
    }

    async fn pump_remote_candidates(
        manager: CallManager,
        call_id: CallId,
        mut candidates: CandidateWatch,
    ) {
        while let Some(candidate) = candidates.recv().await {
            let engine = {
                let active = manager.inner.active.lock();
                match active.as_ref() {
                    Some(call) if call.call_id == call_id => Arc::clone(&call.engine),
                    _ => return,
                }
            };
            engine.add_remote_candidate(candidate).await;
        }
    }

    async fn pump_call_status(
        manager: CallManager,
        call_id: CallId,
        mut records: eresponde_store_core::ValueSubscription,
    ) {
        while let Some(snapshot) = records.recv().await {
            let Some(value) = snapshot else { continue };
            let Some(raw) = value.get("status").cloned() else { continue };
            let Ok(status) = serde_json::from_value::<CallStatus>(raw) else {
                continue;
            };
            match status {
                CallStatus::Ringing => {}
                CallStatus::Answered => manager.mark_connected(call_id).await,
                CallStatus::Rejected | CallStatus::Ended | CallStatus::Missed => {
                    let reason = match status {
                        CallStatus::Rejected => EndReason::RemoteRejected,
                        CallStatus::Missed => EndReason::RemoteMissed,
                        _ => EndReason::RemoteEnded,
                    };
                    info!(%call_id, %status, "remote side ended the call");
                    // Teardown runs on its own task so aborting this one
                    // cannot cut it short.
                    let manager = manager.clone();
                    tokio::spawn(async move {
                        manager.end_with(call_id, reason).await;
                    });
                    return;
                }
            }
        }
    }

    async fn enforce_safety_timeout(manager: CallManager, call_id: CallId, timeout: Duration) {
        tokio::time::sleep(timeout).await;
        let mut active = manager.inner.active.lock();
        if let Some(call) = active.as_mut() {
            if call.call_id == call_id && call.state != CallState::Ended {
                warn!(%call_id, "safety timeout reached; detaching signaling listeners");
                call.tasks.abort_signaling();
            }
        }
    }

    /// Transition to `Connected`, once, from `Dialing`/`Ringing` only
    async fn mark_connected(&self, call_id: CallId) {
        {
            let mut active = self.inner.active.lock();
            match active.as_mut() {
                Some(call)
                    if call.call_id == call_id
                        && matches!(call.state, CallState::Dialing | CallState::Ringing) =>
                {
                    call.state = CallState::Connected;
                    call.tones.stop_ring();
                    call.tones.play_connect();
                }
                _ => return,
            }
        }
        info!(%call_id, "call connected");
        self.emit(CallEvent::StateChanged {
            call_id,
            state: CallState::Connected,
        });

        let mut fields = serde_json::Map::new();
        fields.insert("answeredAt".to_string(), Value::String(now_iso8601()));
        if let Err(error) = self
            .inner
            .store
            .update(&path::voip_call(&call_id.to_string()), fields)
            .await
        {
            warn!(%call_id, %error, "could not record answer time");
        }
    }

    /// Hang up the current session; valid from any state, idempotent
    pub async fn end(&self) {
        let call_id = self.inner.active.lock().as_ref().map(|call| call.call_id);
        if let Some(call_id) = call_id {
            self.end_with(call_id, EndReason::Hangup).await;
        }
    }

    /// Tear one session down; every step runs even if an earlier one fails
    async fn end_with(&self, call_id: CallId, reason: EndReason) {
        let taken = {
            let mut active = self.inner.active.lock();
            match active.as_mut() {
                Some(call) if call.call_id == call_id && call.state != CallState::Ended => {
                    call.state = CallState::Ended;
                    Some((
                        std::mem::take(&mut call.tasks),
                        Arc::clone(&call.engine),
                        Arc::clone(&call.tones),
                    ))
                }
                _ => None,
            }
        };
        let Some((mut tasks, engine, tones)) = taken else {
            return;
        };
        info!(%call_id, ?reason, "ending call");

        tasks.abort_all();
        tones.stop_ring();
        tones.play_end();

        // A remote-initiated end keeps the status the remote side wrote.
        let mut fields = serde_json::Map::new();
        if reason == EndReason::Hangup {
            fields.insert(
                "status".to_string(),
                Value::String(CallStatus::Ended.to_string()),
            );
        }
        fields.insert("endedAt".to_string(), Value::String(now_iso8601()));
        if let Err(error) = self
            .inner
            .store
            .update(&path::voip_call(&call_id.to_string()), fields)
            .await
        {
            warn!(%call_id, %error, "could not record call end");
        }

        let signaling = SignalingChannel::new(Arc::clone(&self.inner.store), call_id);
        if let Err(error) = signaling.clear().await {
            warn!(%call_id, %error, "could not clear signaling mailboxes");
        }

        engine.close().await;
        self.emit(CallEvent::Ended { call_id, reason });
    }

    /// Unwind a session whose setup failed partway
    async fn abort_setup(&self, call_id: CallId) {
        let taken = {
            let mut active = self.inner.active.lock();
            let is_current = active
                .as_ref()
                .map(|call| call.call_id == call_id)
                .unwrap_or(false);
            if is_current {
                active.take()
            } else {
                None
            }
        };
        if let Some(mut call) = taken {
            debug!(%call_id, "call setup aborted");
            call.tasks.abort_all();
            call.tones.stop_ring();
            call.engine.close().await;
        }
    }

    fn set_state(&self, call_id: CallId, state: CallState) {
        let mut active = self.inner.active.lock();
        if let Some(call) = active.as_mut() {
            if call.call_id == call_id && call.state != CallState::Ended {
                call.state = state;
            }
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.inner.events.send(event);
    }
}

struct SessionSubscriptions {
    answer: AnswerWatch,
    candidates: CandidateWatch,
    status: eresponde_store_core::ValueSubscription,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_ids_are_unique_and_printable() {
        let a = CallId::new();
        let b = CallId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn states_display_in_lowercase() {
        assert_eq!(CallState::Dialing.to_string(), "dialing");
        assert_eq!(CallState::Ended.to_string(), "ended");
    }
}
