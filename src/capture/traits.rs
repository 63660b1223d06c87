//! Capture trait definitions
//!
//! Platform-agnostic contract for audio capture peripherals.

use crate::recorder::AudioFormat;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture source not started")]
    NotStarted,

    #[error("Capture source already started")]
    AlreadyStarted,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Capture stream closed")]
    Disconnected,
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// A source of interleaved little-endian PCM bytes
///
/// `read` may return fewer bytes than the buffer holds; `Ok(0)` means the
/// timeout elapsed with nothing available and is not an error by itself.
#[async_trait]
pub trait CaptureSource: Send {
    /// Format of the bytes `read` produces
    fn format(&self) -> AudioFormat;

    /// Enable the peripheral
    async fn start(&mut self) -> CaptureResult<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> CaptureResult<usize>;

    /// Disable the peripheral and release it
    async fn stop(&mut self) -> CaptureResult<()>;

    /// Whether the source is currently running
    fn is_running(&self) -> bool;
}
