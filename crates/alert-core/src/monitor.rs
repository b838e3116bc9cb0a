//! Wiring the watchers to the store

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use eresponde_store_core::{path, SharedStore, StorePath, StoreResult, ValueSubscription};

use crate::alert::AlertSource;
use crate::dispatcher::AlertDispatcher;
use crate::watcher::ArrivalWatcher;

/// Subscribes to the incident and SOS collections and pumps snapshots
/// through one [`ArrivalWatcher`] per collection
///
/// Each collection gets its own task, so observing a snapshot and
/// committing the watcher's key set happen atomically with respect to that
/// collection's notifications: the next snapshot is not looked at until the
/// previous one — including its enrichment — has been fully handled.
pub struct AlertMonitor {
    tasks: Vec<JoinHandle<()>>,
}

impl AlertMonitor {
    /// Subscribe both collections and start watching
    ///
    /// Fails only if a subscription cannot be established; after that the
    /// monitor degrades per-event (bad snapshots are skipped, enrichment
    /// falls back) and never stops on its own.
    pub fn spawn(store: Arc<dyn SharedStore>, dispatcher: AlertDispatcher) -> StoreResult<Self> {
        let reports = store.subscribe_value(&path::crime_reports())?;
        let sos = store.subscribe_value(&path::sos_alerts())?;
        info!("alert monitor watching incident and SOS collections");
        Ok(Self {
            tasks: vec![
                tokio::spawn(Self::watch_collection(
                    path::crime_reports(),
                    AlertSource::Incident,
                    reports,
                    dispatcher.clone(),
                )),
                tokio::spawn(Self::watch_collection(
                    path::sos_alerts(),
                    AlertSource::Sos,
                    sos,
                    dispatcher,
                )),
            ],
        })
    }

    async fn watch_collection(
        path: StorePath,
        source: AlertSource,
        mut subscription: ValueSubscription,
        dispatcher: AlertDispatcher,
    ) {
        let mut watcher = ArrivalWatcher::new();
        while let Some(snapshot) = subscription.recv().await {
            // The watcher commits its key set inside observe(), before any
            // await below, so a notification arriving mid-enrichment can
            // never re-detect the same keys.
            let arrivals = watcher.observe(snapshot.as_ref());
            if arrivals.is_empty() {
                continue;
            }
            debug!(collection = %path, count = arrivals.len(), "arrivals detected");
            if let Some(newest) = ArrivalWatcher::newest_of(&arrivals) {
                dispatcher.on_arrival(source, newest).await;
            }
        }
    }

    /// Detach the subscriptions and stop the tasks
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for AlertMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
