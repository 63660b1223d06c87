//! Audio capture sources
//!
//! The recorder reads PCM through the `CaptureSource` trait. A synthetic
//! tone source is always available; the cpal microphone needs the
//! `microphone` feature.

pub mod pcm;
pub mod tone;
pub mod traits;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use tone::ToneSource;
pub use traits::{CaptureError, CaptureResult, CaptureSource};

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneSource;
