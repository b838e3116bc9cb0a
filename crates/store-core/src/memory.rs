//! Deterministic in-memory shared store
//!
//! Backs every test in the workspace and defines the reference semantics of
//! the [`SharedStore`] contract: value watchers fire with the subtree at
//! their path after any overlapping write, and child watchers deliver each
//! key under their path exactly once. Watchers whose receiver has been
//! dropped are pruned on the next notification pass.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::trace;

use crate::store::{
    ChildEvent, ChildSubscription, SharedStore, SubscriptionGuard, ValueSubscription,
};
use crate::{StorePath, StoreResult};

enum Watcher {
    Value {
        path: StorePath,
        tx: mpsc::UnboundedSender<Option<Value>>,
    },
    Children {
        path: StorePath,
        tx: mpsc::UnboundedSender<ChildEvent>,
        delivered: Mutex<HashSet<String>>,
    },
}

struct Inner {
    tree: RwLock<Value>,
    watchers: DashMap<u64, Watcher>,
    next_watcher_id: AtomicU64,
    next_push_id: AtomicU64,
}

/// In-memory [`SharedStore`] implementation
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(Value::Null),
                watchers: DashMap::new(),
                next_watcher_id: AtomicU64::new(1),
                next_push_id: AtomicU64::new(1),
            }),
        }
    }

    /// Share the store as a trait object
    pub fn shared(self) -> Arc<dyn SharedStore> {
        Arc::new(self)
    }

    fn commit(&self, path: &StorePath, value: Value) {
        {
            let mut tree = self.inner.tree.write();
            set_at(&mut tree, path.segments(), value);
        }
        self.notify(path);
    }

    fn notify(&self, written: &StorePath) {
        let tree = self.inner.tree.read();
        let mut dead = Vec::new();
        for entry in self.inner.watchers.iter() {
            let (id, watcher) = (*entry.key(), entry.value());
            let alive = match watcher {
                Watcher::Value { path, tx } => {
                    if path.overlaps(written) {
                        tx.send(get_at(&tree, path.segments())).is_ok()
                    } else {
                        true
                    }
                }
                Watcher::Children {
                    path,
                    tx,
                    delivered,
                } => {
                    if path.overlaps(written) {
                        send_new_children(&tree, path, tx, delivered)
                    } else {
                        true
                    }
                }
            };
            if !alive {
                dead.push(id);
            }
        }
        drop(tree);
        for id in dead {
            trace!(watcher = id, "pruning store watcher with dropped receiver");
            self.inner.watchers.remove(&id);
        }
    }

    fn register(&self, watcher: Watcher) -> SubscriptionGuard {
        let id = self.inner.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        self.inner.watchers.insert(id, watcher);
        let inner = Arc::clone(&self.inner);
        SubscriptionGuard::new(move || {
            inner.watchers.remove(&id);
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> StoreResult<Option<Value>> {
        let tree = self.inner.tree.read();
        Ok(get_at(&tree, path.segments()))
    }

    async fn write(&self, path: &StorePath, value: Value) -> StoreResult<()> {
        trace!(%path, "store write");
        self.commit(path, value);
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> StoreResult<()> {
        trace!(%path, count = fields.len(), "store update");
        let merged = {
            let tree = self.inner.tree.read();
            let mut current = match get_at(&tree, path.segments()) {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            for (key, value) in fields {
                current.insert(key, value);
            }
            Value::Object(current)
        };
        self.commit(path, merged);
        Ok(())
    }

    async fn push(&self, path: &StorePath, value: Value) -> StoreResult<String> {
        // Zero-padded counter keys keep push order and key order aligned,
        // like the timestamp-prefixed ids the hosted store generates.
        let key = format!(
            "child-{:010}",
            self.inner.next_push_id.fetch_add(1, Ordering::Relaxed)
        );
        trace!(%path, %key, "store push");
        self.commit(&path.child(key.clone()), value);
        Ok(key)
    }

    fn subscribe_value(&self, path: &StorePath) -> StoreResult<ValueSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Initial snapshot is delivered before the watcher is registered so
        // it always precedes any later write.
        {
            let tree = self.inner.tree.read();
            let _ = tx.send(get_at(&tree, path.segments()));
        }
        let guard = self.register(Watcher::Value {
            path: path.clone(),
            tx,
        });
        Ok(ValueSubscription::new(rx, guard))
    }

    fn subscribe_children(&self, path: &StorePath) -> StoreResult<ChildSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let delivered = Mutex::new(HashSet::new());
        {
            let tree = self.inner.tree.read();
            send_new_children(&tree, path, &tx, &delivered);
        }
        let guard = self.register(Watcher::Children {
            path: path.clone(),
            tx,
            delivered,
        });
        Ok(ChildSubscription::new(rx, guard))
    }

    fn subscription_count(&self) -> usize {
        self.inner.watchers.len()
    }
}

/// Deliver children at `path` not yet seen by this watcher, in key order.
/// Returns false once the receiver is gone.
fn send_new_children(
    tree: &Value,
    path: &StorePath,
    tx: &mpsc::UnboundedSender<ChildEvent>,
    delivered: &Mutex<HashSet<String>>,
) -> bool {
    let children = match get_at(tree, path.segments()) {
        Some(Value::Object(map)) => map,
        _ => return true,
    };
    let mut seen = delivered.lock();
    for (key, value) in children {
        if seen.contains(&key) {
            continue;
        }
        seen.insert(key.clone());
        if tx.send(ChildEvent { key, value }).is_err() {
            return false;
        }
    }
    true
}

fn get_at(tree: &Value, segments: &[String]) -> Option<Value> {
    let mut node = tree;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node.clone())
    }
}

fn set_at(tree: &mut Value, segments: &[String], value: Value) {
    let Some((last, ancestors)) = segments.split_last() else {
        *tree = value;
        return;
    };
    let mut node = tree;
    for segment in ancestors {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => node = map.entry(segment.clone()).or_insert(Value::Null),
            _ => return,
        }
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if value.is_null() {
            map.remove(last);
        } else {
            map.insert(last.clone(), value);
        }
    }
}
