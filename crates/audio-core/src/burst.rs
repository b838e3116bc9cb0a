//! Repeating burst scheduler

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{AudioSink, ToneSpec};

/// Timing for a [`BurstLoop`]
#[derive(Debug, Clone, Copy)]
pub struct BurstLoopConfig {
    /// Interval between burst starts
    pub cadence: Duration,
    /// How long after starting a burst its resource is torn down
    pub guard: Duration,
}

impl BurstLoopConfig {
    /// Timing of the emergency alarm: 700 ms cadence, 650 ms guard
    pub fn alarm() -> Self {
        Self {
            cadence: Duration::from_millis(700),
            guard: Duration::from_millis(650),
        }
    }

    /// Timing of the caller-side ringback: 2 s cadence, 1.6 s guard
    pub fn ring() -> Self {
        Self {
            cadence: Duration::from_millis(2000),
            guard: Duration::from_millis(1600),
        }
    }
}

/// Plays a tone on a fixed cadence until stopped
///
/// Every iteration constructs a fresh tone resource and schedules its
/// teardown after the guard window, so resources never accumulate and a
/// stuck device cannot pile up playing tones. [`BurstLoop::start`] is
/// idempotent: any previous schedule is stopped first, so bursts from two
/// concurrent schedules can never overlap.
pub struct BurstLoop {
    sink: Arc<dyn AudioSink>,
    spec: ToneSpec,
    config: BurstLoopConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BurstLoop {
    /// Create a stopped loop
    pub fn new(sink: Arc<dyn AudioSink>, spec: ToneSpec, config: BurstLoopConfig) -> Self {
        Self {
            sink,
            spec,
            config,
            task: Mutex::new(None),
        }
    }

    /// Begin (or cleanly restart) the schedule
    pub fn start(&self) {
        self.stop();
        let sink = Arc::clone(&self.sink);
        let spec = self.spec.clone();
        let config = self.config;
        let handle = tokio::spawn(async move {
            loop {
                match sink.play(&spec) {
                    Ok(tone) => {
                        // The burst disposes itself after the guard window
                        // even if this loop is aborted in the meantime.
                        tokio::spawn(async move {
                            tokio::time::sleep(config.guard).await;
                            tone.stop();
                        });
                    }
                    Err(error) => {
                        warn!(tone = spec.name, %error, "could not play tone burst");
                    }
                }
                tokio::time::sleep(config.cadence).await;
            }
        });
        *self.task.lock() = Some(handle);
    }

    /// Halt the schedule; in-flight bursts still self-dispose
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Whether a schedule is currently active
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for BurstLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
