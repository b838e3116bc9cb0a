//! Tone specifications

use std::time::Duration;

/// A short synthesized tone: a mix of sine frequencies for a fixed duration
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    /// Stable name, used for logging and test assertions
    pub name: &'static str,
    /// Sine components mixed into the burst
    pub frequencies_hz: Vec<f32>,
    /// How long the burst plays
    pub duration: Duration,
}

impl ToneSpec {
    /// The emergency alarm burst: two sweep pairs, 400 ms
    ///
    /// Frequencies match the siren the dashboard has always played, so the
    /// sound stays recognizable to dispatchers.
    pub fn alarm_burst() -> Self {
        Self {
            name: "alarm",
            frequencies_hz: vec![800.0, 1200.0, 600.0, 1000.0],
            duration: Duration::from_millis(400),
        }
    }

    /// Caller-side ringback
    pub fn ring() -> Self {
        Self {
            name: "ring",
            frequencies_hz: vec![440.0, 480.0],
            duration: Duration::from_millis(1500),
        }
    }

    /// Short confirmation when the remote side answers
    pub fn connect() -> Self {
        Self {
            name: "connect",
            frequencies_hz: vec![880.0],
            duration: Duration::from_millis(200),
        }
    }

    /// Short burst when the call ends
    pub fn end() -> Self {
        Self {
            name: "end",
            frequencies_hz: vec![480.0, 620.0],
            duration: Duration::from_millis(300),
        }
    }
}
