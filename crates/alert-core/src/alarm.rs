//! The audible alarm

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eresponde_audio_core::{AudioSink, BurstLoop, BurstLoopConfig, ToneSpec};
use tracing::debug;

/// Repeats the siren burst while an alert is active and alarms are enabled
///
/// The player only schedules; whether an alert is active is the
/// dispatcher's knowledge, so re-enabling resumes through
/// [`crate::AlertDispatcher::set_alarm_enabled`], which restarts the player
/// only while an alert is up.
pub struct AlarmPlayer {
    bursts: BurstLoop,
    enabled: AtomicBool,
}

impl AlarmPlayer {
    /// Create an enabled, silent player
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            bursts: BurstLoop::new(sink, ToneSpec::alarm_burst(), BurstLoopConfig::alarm()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Begin sounding; restarts cleanly if already sounding
    ///
    /// No-op while muted, so callers can invoke it unconditionally when an
    /// alert appears.
    pub fn start(&self) {
        if !self.is_enabled() {
            return;
        }
        debug!("alarm started");
        self.bursts.start();
    }

    /// Stop sounding
    pub fn stop(&self) {
        self.bursts.stop();
    }

    /// Mute or unmute scheduling
    ///
    /// Muting halts the schedule without touching the visible alert.
    /// Unmuting alone does not sound the alarm; the dispatcher restarts it
    /// if an alert is still active.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            debug!("alarm muted");
            self.stop();
        }
    }

    /// Whether the alarm is unmuted
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Whether bursts are currently being scheduled
    pub fn is_sounding(&self) -> bool {
        self.bursts.is_running()
    }
}
