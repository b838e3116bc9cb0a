//! The shared-store contract
//!
//! The hosted realtime database is multi-writer (the dashboard and the
//! remote mobile client both write into the same call and status records)
//! and offers no transactional guarantee across fields. Implementations and
//! callers must treat every write as idempotent and every read as
//! eventually consistent.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{StorePath, StoreResult};

/// A child added under a watched collection
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEvent {
    /// Key of the new child
    pub key: String,
    /// Value of the new child at the time it was observed
    pub value: Value,
}

/// Releases a store listener when dropped
///
/// Detaching is idempotent; callers that need deterministic teardown call
/// [`SubscriptionGuard::detach`] instead of relying on drop order.
pub struct SubscriptionGuard {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    /// Wrap a detach closure
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Release the listener now
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// A live value subscription
///
/// Delivers the value present at subscribe time (possibly `None`) and then
/// the watched subtree after every write that overlaps it.
#[derive(Debug)]
pub struct ValueSubscription {
    rx: mpsc::UnboundedReceiver<Option<Value>>,
    guard: SubscriptionGuard,
}

impl ValueSubscription {
    /// Assemble a subscription from its receiver and detach guard
    pub fn new(rx: mpsc::UnboundedReceiver<Option<Value>>, guard: SubscriptionGuard) -> Self {
        Self { rx, guard }
    }

    /// Wait for the next snapshot; `None` once detached and drained
    pub async fn recv(&mut self) -> Option<Option<Value>> {
        self.rx.recv().await
    }

    /// Non-blocking receive for already-delivered snapshots
    pub fn try_recv(&mut self) -> Option<Option<Value>> {
        self.rx.try_recv().ok()
    }

    /// Release the listener immediately
    pub fn detach(&mut self) {
        self.guard.detach();
    }
}

/// A live child-added subscription
///
/// Delivers every existing child at subscribe time and every child added
/// afterward, each key exactly once, in key order per batch.
#[derive(Debug)]
pub struct ChildSubscription {
    rx: mpsc::UnboundedReceiver<ChildEvent>,
    guard: SubscriptionGuard,
}

impl ChildSubscription {
    /// Assemble a subscription from its receiver and detach guard
    pub fn new(rx: mpsc::UnboundedReceiver<ChildEvent>, guard: SubscriptionGuard) -> Self {
        Self { rx, guard }
    }

    /// Wait for the next child; `None` once detached and drained
    pub async fn recv(&mut self) -> Option<ChildEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive for already-delivered children
    pub fn try_recv(&mut self) -> Option<ChildEvent> {
        self.rx.try_recv().ok()
    }

    /// Release the listener immediately
    pub fn detach(&mut self) {
        self.guard.detach();
    }
}

/// Read / write / subscribe access to the shared store
///
/// [`crate::MemoryStore`] is the reference implementation; a production
/// binding over the hosted realtime database implements the same trait.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read the subtree at `path`; `Ok(None)` when nothing is stored there
    async fn read(&self, path: &StorePath) -> StoreResult<Option<Value>>;

    /// Replace the subtree at `path`
    async fn write(&self, path: &StorePath, value: Value) -> StoreResult<()>;

    /// Merge `fields` into the object at `path`, creating it if absent
    async fn update(
        &self,
        path: &StorePath,
        fields: serde_json::Map<String, Value>,
    ) -> StoreResult<()>;

    /// Append a child with a generated key under `path`, returning the key
    async fn push(&self, path: &StorePath, value: Value) -> StoreResult<String>;

    /// Watch the subtree at `path`
    fn subscribe_value(&self, path: &StorePath) -> StoreResult<ValueSubscription>;

    /// Watch for children added under `path`
    fn subscribe_children(&self, path: &StorePath) -> StoreResult<ChildSubscription>;

    /// Number of live listeners, for teardown verification
    fn subscription_count(&self) -> usize;
}
