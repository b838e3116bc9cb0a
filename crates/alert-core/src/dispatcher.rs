//! Turning arrivals into the single visible alert

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eresponde_audio_core::AudioSink;
use eresponde_store_core::{path, CivilianAccount, IncidentRecord, SharedStore, SosRecord};

use crate::alert::{Alert, AlertDetail, AlertSource, Severity};
use crate::watcher::Arrival;
use crate::{extract, AlarmPlayer, Notifier};

/// Shown whenever a reporter's name cannot be resolved
pub const PLACEHOLDER_REPORTER: &str = "Anonymous Reporter";

struct ActiveAlert {
    alert: Alert,
    /// Identifies which alert a pending timer belongs to
    epoch: u64,
    close_timer: Option<JoinHandle<()>>,
}

struct Inner {
    store: Arc<dyn SharedStore>,
    notifier: Arc<dyn Notifier>,
    alarm: AlarmPlayer,
    active: Mutex<Option<ActiveAlert>>,
    next_epoch: AtomicU64,
}

/// Owns the single visible alert and everything attached to it
///
/// Replacement policy is latest-wins: a new alert replaces the visible one
/// unconditionally, even when the visible one is more severe. That matches
/// what the dashboard has always done; it does mean an unacknowledged
/// high-severity alert can be displaced by a later low-severity one, which
/// product has not revisited. The `replace_drops_unacknowledged_higher_severity`
/// test pins the behavior so changing it is a decision, not an accident.
#[derive(Clone)]
pub struct AlertDispatcher {
    inner: Arc<Inner>,
}

impl AlertDispatcher {
    /// Create a dispatcher over the given store, notifier, and audio sink
    pub fn new(
        store: Arc<dyn SharedStore>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                alarm: AlarmPlayer::new(sink),
                active: Mutex::new(None),
                next_epoch: AtomicU64::new(1),
            }),
        }
    }

    /// Build and show an alert for one arrival
    ///
    /// The reporter-name enrichment is a single best-effort read; any
    /// failure degrades to [`PLACEHOLDER_REPORTER`] and the alert still
    /// shows.
    pub async fn on_arrival(&self, source: AlertSource, arrival: &Arrival) {
        let alert = match source {
            AlertSource::Incident => self.build_incident_alert(arrival).await,
            AlertSource::Sos => self.build_sos_alert(arrival).await,
        };
        self.show(alert);
    }

    async fn build_incident_alert(&self, arrival: &Arrival) -> Alert {
        // A non-object snapshot decodes to the all-None default.
        let record: IncidentRecord =
            serde_json::from_value(arrival.record.clone()).unwrap_or_default();
        let crime_type = record.incident_type().unwrap_or("Unknown").to_string();
        let reporter = self
            .resolve_reporter_name(record.reporter_uid.as_deref())
            .await;
        let severity = Severity::parse(record.severity.as_deref());

        let mut details = vec![
            AlertDetail::new("Crime Type", crime_type),
            AlertDetail::new("Reported By", reporter),
            AlertDetail::emphasized("Severity", severity.label()),
        ];
        if let Some(location) = extract::first_non_empty(&arrival.record, extract::LOCATION_TEXT) {
            details.push(AlertDetail::new("Location", location));
        }

        Alert {
            id: arrival.key.clone(),
            title: "NEW CRIME REPORT".to_string(),
            severity,
            source: AlertSource::Incident,
            details,
            created_at: Utc::now(),
            auto_close_after: None,
        }
    }

    async fn build_sos_alert(&self, arrival: &Arrival) -> Alert {
        let record: SosRecord = serde_json::from_value(arrival.record.clone()).unwrap_or_default();
        let alert_type = record.sos_type().unwrap_or("SOS Alert").to_string();
        let reporter = match record.embedded_reporter_name() {
            Some(name) => name.to_string(),
            None => self.resolve_reporter_name(record.reporter_id()).await,
        };
        let status = record
            .status
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "ACTIVE".to_string());

        Alert {
            id: arrival.key.clone(),
            title: if record.is_smart_watch() {
                "NEW SMART WATCH SOS".to_string()
            } else {
                "NEW SOS ALERT".to_string()
            },
            // An SOS is maximum urgency no matter what its record claims.
            severity: Severity::Immediate,
            source: AlertSource::Sos,
            details: vec![
                AlertDetail::new("Alert Type", alert_type),
                AlertDetail::new("Triggered By", reporter),
                AlertDetail::emphasized("Status", status),
            ],
            created_at: Utc::now(),
            auto_close_after: None,
        }
    }

    async fn resolve_reporter_name(&self, uid: Option<&str>) -> String {
        let Some(uid) = uid else {
            return PLACEHOLDER_REPORTER.to_string();
        };
        match self.inner.store.read(&path::civilian_account(uid)).await {
            Ok(Some(value)) => serde_json::from_value::<CivilianAccount>(value)
                .ok()
                .and_then(|account| account.display_label())
                .unwrap_or_else(|| PLACEHOLDER_REPORTER.to_string()),
            Ok(None) => PLACEHOLDER_REPORTER.to_string(),
            Err(error) => {
                warn!(uid, %error, "reporter lookup failed");
                PLACEHOLDER_REPORTER.to_string()
            }
        }
    }

    /// Show an alert, unconditionally replacing the visible one
    pub fn show(&self, alert: Alert) {
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        let mut active = self.inner.active.lock();
        if let Some(previous) = active.take() {
            if let Some(timer) = previous.close_timer {
                timer.abort();
            }
            debug!(replaced = %previous.alert.id, by = %alert.id, "visible alert replaced");
        }

        let close_timer = alert.auto_close_after.map(|after| {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                dispatcher.close_epoch(epoch);
            })
        });

        info!(id = %alert.id, severity = alert.severity.label(), title = %alert.title, "alert shown");
        if !self.inner.notifier.has_focus() {
            self.inner.notifier.display(&alert.title, &alert.body());
        }

        *active = Some(ActiveAlert {
            alert,
            epoch,
            close_timer,
        });
        drop(active);

        self.inner.alarm.start();
    }

    /// Dismiss the visible alert, if any
    pub fn close(&self) {
        let mut active = self.inner.active.lock();
        if let Some(previous) = active.take() {
            if let Some(timer) = previous.close_timer {
                timer.abort();
            }
            debug!(id = %previous.alert.id, "alert closed");
        }
        drop(active);
        self.inner.alarm.stop();
    }

    /// Auto-close path: only closes if the alert it was armed for is still up
    fn close_epoch(&self, epoch: u64) {
        let mut active = self.inner.active.lock();
        match active.as_ref() {
            Some(current) if current.epoch == epoch => {
                let previous = active.take();
                drop(active);
                if let Some(previous) = previous {
                    debug!(id = %previous.alert.id, "alert auto-closed");
                }
                self.inner.alarm.stop();
            }
            _ => {
                // A newer alert replaced the one this timer belonged to.
            }
        }
    }

    /// Mute or unmute the alarm without touching the visible alert
    ///
    /// Unmuting resumes the siren immediately only if an alert is still up.
    pub fn set_alarm_enabled(&self, enabled: bool) {
        self.inner.alarm.set_enabled(enabled);
        if enabled && self.inner.active.lock().is_some() {
            self.inner.alarm.start();
        }
    }

    /// The currently visible alert, if any
    pub fn visible(&self) -> Option<Alert> {
        self.inner.active.lock().as_ref().map(|a| a.alert.clone())
    }

    /// The alarm player, for state inspection
    pub fn alarm(&self) -> &AlarmPlayer {
        &self.inner.alarm
    }
}
