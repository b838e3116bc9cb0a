//! Recording audio sink for tests
//!
//! Captures every tone start and stop with a global sequence number so tests
//! can assert ordering, cadence counts, and that every started burst was
//! torn down.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AudioResult, AudioSink, ToneHandle, ToneSpec};

/// What happened to a tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneEventKind {
    Started,
    Stopped,
}

/// One recorded tone event
#[derive(Debug, Clone)]
pub struct ToneEvent {
    /// Monotonic sequence number across the sink
    pub seq: u64,
    /// `ToneSpec::name` of the tone
    pub name: &'static str,
    pub kind: ToneEventKind,
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ToneEvent>>,
    next_seq: AtomicU64,
}

impl Recorder {
    fn record(&self, name: &'static str, kind: ToneEventKind) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.events.lock().push(ToneEvent { seq, name, kind });
    }
}

/// An [`AudioSink`] that records instead of playing
#[derive(Default)]
pub struct TestAudioSink {
    recorder: Arc<Recorder>,
}

impl TestAudioSink {
    /// Create an empty recorder sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<ToneEvent> {
        self.recorder.events.lock().clone()
    }

    /// How many tones with this name have started
    pub fn started_count(&self, name: &str) -> usize {
        self.count(name, ToneEventKind::Started)
    }

    /// How many tones with this name have been stopped
    pub fn stopped_count(&self, name: &str) -> usize {
        self.count(name, ToneEventKind::Stopped)
    }

    /// Whether a tone with this name is currently playing
    pub fn is_playing(&self, name: &str) -> bool {
        self.started_count(name) > self.stopped_count(name)
    }

    fn count(&self, name: &str, kind: ToneEventKind) -> usize {
        self.recorder
            .events
            .lock()
            .iter()
            .filter(|event| event.name == name && event.kind == kind)
            .count()
    }
}

struct TestToneHandle {
    recorder: Arc<Recorder>,
    name: &'static str,
    stopped: AtomicBool,
}

impl ToneHandle for TestToneHandle {
    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.recorder.record(self.name, ToneEventKind::Stopped);
        }
    }
}

impl Drop for TestToneHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl AudioSink for TestAudioSink {
    fn play(&self, spec: &ToneSpec) -> AudioResult<Box<dyn ToneHandle>> {
        self.recorder.record(spec.name, ToneEventKind::Started);
        Ok(Box::new(TestToneHandle {
            recorder: Arc::clone(&self.recorder),
            name: spec.name,
            stopped: AtomicBool::new(false),
        }))
    }
}
