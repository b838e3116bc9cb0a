//! Signaling over the shared store
//!
//! The store is the signaling relay: the caller writes its offer and ICE
//! candidates into per-call mailboxes and the remote mobile client writes
//! the answer and its own candidates back. Both sides only ever append or
//! replace whole mailbox values, so every write is idempotent and neither
//! side needs the other to be online when it writes.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use eresponde_store_core::{
    path, ChildSubscription, IceCandidateInit, SessionDescription, SharedStore, StorePath,
    ValueSubscription,
};

use crate::error::{CallError, CallResult};
use crate::session::CallId;

/// Which side of the call a mailbox belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    /// The path segment used in the store layout
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Caller => "caller",
            Role::Callee => "callee",
        }
    }

    /// The opposite side
    pub fn remote(&self) -> Role {
        match self {
            Role::Caller => Role::Callee,
            Role::Callee => Role::Caller,
        }
    }
}

/// The signaling mailboxes of one call
///
/// Scoped to a single [`CallId`]; publishing is fire-and-forget and the
/// watch methods decode per message, logging and skipping anything
/// malformed so one bad payload can never wedge the session.
#[derive(Clone)]
pub struct SignalingChannel {
    store: Arc<dyn SharedStore>,
    call_id: CallId,
}

impl SignalingChannel {
    /// Open the mailboxes for one call
    pub fn new(store: Arc<dyn SharedStore>, call_id: CallId) -> Self {
        Self { store, call_id }
    }

    /// The call these mailboxes belong to
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    fn root(&self) -> StorePath {
        StorePath::from_segments(["signaling", &self.call_id.to_string()])
    }

    /// Write the offer into the offer mailbox
    pub async fn publish_offer(&self, offer: &SessionDescription) -> CallResult<()> {
        let value = encode(offer)?;
        let offer_path = path::signaling_offer(&self.call_id.to_string());
        debug!(call_id = %self.call_id, "publishing offer");
        self.store.write(&offer_path, value).await?;
        Ok(())
    }

    /// Write the answer into the answer mailbox
    pub async fn publish_answer(&self, answer: &SessionDescription) -> CallResult<()> {
        let value = encode(answer)?;
        let answer_path = path::signaling_answer(&self.call_id.to_string());
        debug!(call_id = %self.call_id, "publishing answer");
        self.store.write(&answer_path, value).await?;
        Ok(())
    }

    /// Append a candidate onto the given role's candidate mailbox
    pub async fn publish_candidate(
        &self,
        role: Role,
        candidate: &IceCandidateInit,
    ) -> CallResult<()> {
        let value = encode(candidate)?;
        let mailbox = path::signaling_candidates(&self.call_id.to_string(), role.as_str());
        self.store.push(&mailbox, value).await?;
        Ok(())
    }

    /// Watch the answer mailbox
    ///
    /// A late subscriber still receives an already-written answer: the
    /// underlying value subscription delivers the current mailbox contents
    /// first.
    pub fn watch_answer(&self) -> CallResult<AnswerWatch> {
        let answer_path = path::signaling_answer(&self.call_id.to_string());
        let subscription = self.store.subscribe_value(&answer_path)?;
        Ok(AnswerWatch {
            path: answer_path,
            subscription,
        })
    }

    /// Watch the given role's candidate mailbox
    ///
    /// Delivers existing candidates first, then every candidate appended
    /// later, each exactly once.
    pub fn watch_candidates(&self, role: Role) -> CallResult<CandidateWatch> {
        let mailbox = path::signaling_candidates(&self.call_id.to_string(), role.as_str());
        let subscription = self.store.subscribe_children(&mailbox)?;
        Ok(CandidateWatch {
            path: mailbox,
            subscription,
        })
    }

    /// Remove every mailbox of this call, best-effort
    pub async fn clear(&self) -> CallResult<()> {
        self.store.write(&self.root(), Value::Null).await?;
        Ok(())
    }
}

fn encode<T: serde::Serialize>(payload: &T) -> CallResult<Value> {
    serde_json::to_value(payload).map_err(|error| CallError::protocol(error.to_string()))
}

/// Decoded view over the answer mailbox
#[derive(Debug)]
pub struct AnswerWatch {
    path: StorePath,
    subscription: ValueSubscription,
}

impl AnswerWatch {
    /// Wait for the next decodable answer; `None` once detached
    pub async fn recv(&mut self) -> Option<SessionDescription> {
        while let Some(snapshot) = self.subscription.recv().await {
            let Some(value) = snapshot else { continue };
            match serde_json::from_value(value) {
                Ok(answer) => return Some(answer),
                Err(error) => {
                    warn!(path = %self.path, %error, "skipping malformed answer payload");
                }
            }
        }
        None
    }

    /// Release the listener immediately
    pub fn detach(&mut self) {
        self.subscription.detach();
    }
}

/// Decoded view over a candidate mailbox
#[derive(Debug)]
pub struct CandidateWatch {
    path: StorePath,
    subscription: ChildSubscription,
}

impl CandidateWatch {
    /// Wait for the next decodable candidate; `None` once detached
    pub async fn recv(&mut self) -> Option<IceCandidateInit> {
        while let Some(event) = self.subscription.recv().await {
            match serde_json::from_value(event.value) {
                Ok(candidate) => return Some(candidate),
                Err(error) => {
                    warn!(path = %self.path, key = %event.key, %error, "skipping malformed candidate payload");
                }
            }
        }
        None
    }

    /// Release the listener immediately
    pub fn detach(&mut self) {
        self.subscription.detach();
    }
}
