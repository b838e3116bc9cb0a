//! In-call audio feedback

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use eresponde_audio_core::{AudioSink, BurstLoop, BurstLoopConfig, ToneSpec};

/// The caller-side tones of one call
///
/// Ringback repeats on a [`BurstLoop`]; connect and end are one-shot bursts
/// that self-dispose shortly after their duration, so a torn-down session
/// never leaves a playing resource behind.
pub struct CallTones {
    sink: Arc<dyn AudioSink>,
    ring: BurstLoop,
}

impl CallTones {
    /// Create silent tones over the given sink
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            ring: BurstLoop::new(Arc::clone(&sink), ToneSpec::ring(), BurstLoopConfig::ring()),
            sink,
        }
    }

    /// Begin ringback; restarts cleanly if already ringing
    pub fn start_ring(&self) {
        self.ring.start();
    }

    /// Halt ringback
    pub fn stop_ring(&self) {
        self.ring.stop();
    }

    /// Whether ringback is scheduled
    pub fn is_ringing(&self) -> bool {
        self.ring.is_running()
    }

    /// Play the answered confirmation once
    pub fn play_connect(&self) {
        play_once(&self.sink, ToneSpec::connect());
    }

    /// Play the call-ended burst once
    pub fn play_end(&self) {
        play_once(&self.sink, ToneSpec::end());
    }
}

fn play_once(sink: &Arc<dyn AudioSink>, spec: ToneSpec) {
    let guard = spec.duration + Duration::from_millis(100);
    match sink.play(&spec) {
        Ok(tone) => {
            tokio::spawn(async move {
                tokio::time::sleep(guard).await;
                tone.stop();
            });
        }
        Err(error) => {
            warn!(tone = spec.name, %error, "could not play call tone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eresponde_audio_core::TestAudioSink;

    #[tokio::test(start_paused = true)]
    async fn one_shot_tones_self_dispose() {
        let sink = Arc::new(TestAudioSink::new());
        let tones = CallTones::new(Arc::clone(&sink) as Arc<dyn AudioSink>);

        tones.play_connect();
        tones.play_end();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(sink.started_count("connect"), 1);
        assert_eq!(sink.stopped_count("connect"), 1);
        assert_eq!(sink.started_count("end"), 1);
        assert_eq!(sink.stopped_count("end"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ringback_repeats_until_stopped() {
        let sink = Arc::new(TestAudioSink::new());
        let tones = CallTones::new(Arc::clone(&sink) as Arc<dyn AudioSink>);

        tones.start_ring();
        assert!(tones.is_ringing());
        // 0 ms, 2000 ms, 4000 ms: three ring starts within 5 s.
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(sink.started_count("ring"), 3);

        tones.stop_ring();
        assert!(!tones.is_ringing());
        let after_stop = sink.started_count("ring");
        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(sink.started_count("ring"), after_stop);
    }
}
