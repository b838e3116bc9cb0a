//! Audio output devices
//!
//! Only the recording test device ships by default; the cpal-backed system
//! device is behind the `device-cpal` feature.

pub mod test_audio;

#[cfg(feature = "device-cpal")]
pub mod cpal_impl;
