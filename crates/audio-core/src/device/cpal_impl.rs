//! System audio output through cpal
//!
//! Each tone gets its own output stream on a dedicated thread: cpal streams
//! are not `Send` on every platform, so the stream lives and dies on the
//! thread that built it. The handle only signals that thread.

use std::f32::consts::TAU;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::warn;

use crate::{AudioError, AudioResult, AudioSink, ToneHandle, ToneSpec};

/// Plays tones on the default system output device
#[derive(Debug, Default)]
pub struct CpalAudioSink;

impl CpalAudioSink {
    /// Create a sink over the default host
    pub fn new() -> Self {
        Self
    }
}

struct CpalToneHandle {
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    stopped: AtomicBool,
}

impl ToneHandle for CpalToneHandle {
    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for CpalToneHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl AudioSink for CpalAudioSink {
    fn play(&self, spec: &ToneSpec) -> AudioResult<Box<dyn ToneHandle>> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let spec = spec.clone();
        std::thread::Builder::new()
            .name(format!("tone-{}", spec.name))
            .spawn(move || {
                if let Err(error) = run_tone(&spec, stop_rx) {
                    warn!(tone = spec.name, %error, "tone playback failed");
                }
            })
            .map_err(|e| AudioError::playback(e.to_string()))?;
        Ok(Box::new(CpalToneHandle {
            stop_tx: Mutex::new(Some(stop_tx)),
            stopped: AtomicBool::new(false),
        }))
    }
}

fn run_tone(spec: &ToneSpec, stop_rx: mpsc::Receiver<()>) -> AudioResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::DeviceUnavailable)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::playback(e.to_string()))?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::unsupported(format!(
            "output device sample format {:?}",
            config.sample_format()
        )));
    }

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    let frequencies = spec.frequencies_hz.clone();
    let gain = 0.2 / frequencies.len().max(1) as f32;
    let mut frame_index = 0u64;

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                for frame in data.chunks_mut(channels) {
                    let t = frame_index as f32 / sample_rate;
                    frame_index += 1;
                    let mut sample = 0.0;
                    for freq in &frequencies {
                        sample += (t * freq * TAU).sin();
                    }
                    sample *= gain;
                    for slot in frame {
                        *slot = sample;
                    }
                }
            },
            |error| warn!(%error, "output stream error"),
            None,
        )
        .map_err(|e| AudioError::playback(e.to_string()))?;
    stream.play().map_err(|e| AudioError::playback(e.to_string()))?;

    // Block until the guard/stop signal or the natural end of the burst.
    let _ = stop_rx.recv_timeout(spec.duration);
    Ok(())
}
