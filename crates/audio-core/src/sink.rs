//! The audio output seam

use crate::{AudioResult, ToneSpec};

/// A playing tone
///
/// Stopping is idempotent, and the handle stops its tone when dropped, so a
/// forgotten handle can never leak a playing resource.
pub trait ToneHandle: Send {
    /// Stop the tone now
    fn stop(&self);
}

/// Produces tone resources
///
/// Each call to [`AudioSink::play`] constructs an independent resource; the
/// caller (usually [`crate::BurstLoop`]) is responsible for tearing it down
/// within its guard window.
pub trait AudioSink: Send + Sync {
    /// Start playing `spec`, returning a handle that stops it
    fn play(&self, spec: &ToneSpec) -> AudioResult<Box<dyn ToneHandle>>;
}

/// Sink that plays nothing, for headless deployments
#[derive(Debug, Default, Clone)]
pub struct NullAudioSink;

struct NullHandle;

impl ToneHandle for NullHandle {
    fn stop(&self) {}
}

impl AudioSink for NullAudioSink {
    fn play(&self, _spec: &ToneSpec) -> AudioResult<Box<dyn ToneHandle>> {
        Ok(Box::new(NullHandle))
    }
}
