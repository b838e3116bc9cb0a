//! Audio output seams for the operations dashboard
//!
//! The alert alarm and the call tones (ring / connect / end) all reduce to
//! the same mechanism: play a freshly constructed, self-disposing tone
//! resource, and for the repeating cases re-play it on a fixed cadence with
//! a guard-window teardown so resources never accumulate.
//!
//! The [`AudioSink`] trait is the seam to the platform. The default build
//! carries no real device; [`TestAudioSink`] records everything for tests,
//! and the `device-cpal` feature adds a system output device in the same
//! optional style the rest of the stack uses for hardware access.

pub mod burst;
pub mod device;
pub mod error;
pub mod sink;
pub mod tone;

pub use burst::{BurstLoop, BurstLoopConfig};
pub use device::test_audio::{TestAudioSink, ToneEvent, ToneEventKind};
pub use error::{AudioError, AudioResult};
pub use sink::{AudioSink, NullAudioSink, ToneHandle};
pub use tone::ToneSpec;

#[cfg(feature = "device-cpal")]
pub use device::cpal_impl::CpalAudioSink;
