//! Synthetic sine-wave capture source
//!
//! Stands in for the microphone on machines without one, and in tests.

use super::pcm::encode_sample;
use super::traits::{CaptureError, CaptureResult, CaptureSource};
use crate::recorder::AudioFormat;
use async_trait::async_trait;
use std::f64::consts::TAU;
use std::time::Duration;

/// Sine generator producing PCM in a fixed format
pub struct ToneSource {
    format: AudioFormat,
    frequency_hz: f64,
    amplitude: f32,
    /// Frame index of the next sample
    position: u64,
    running: bool,
    /// Pace reads to the sample clock instead of returning instantly
    realtime: bool,
    /// Fail with a device error once this many bytes have been produced
    fail_after: Option<u64>,
    produced: u64,
    scratch: Vec<u8>,
}

impl ToneSource {
    pub fn new(format: AudioFormat, frequency_hz: f64) -> Self {
        Self {
            format,
            frequency_hz,
            amplitude: 0.5,
            position: 0,
            running: false,
            realtime: false,
            fail_after: None,
            produced: 0,
            scratch: Vec::new(),
        }
    }

    /// Peak amplitude, 0.0-1.0
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Sleep for the audio duration of each read
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    /// Simulate a hardware fault after `bytes` have been delivered
    pub fn fail_after(mut self, bytes: u64) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    /// Total bytes delivered so far
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

#[async_trait]
impl CaptureSource for ToneSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn start(&mut self) -> CaptureResult<()> {
        if self.running {
            return Err(CaptureError::AlreadyStarted);
        }
        self.running = true;
        tracing::info!(
            "Tone source started: {}Hz at {}Hz/{}ch/{}bit",
            self.frequency_hz,
            self.format.sample_rate,
            self.format.channels,
            self.format.bits_per_sample
        );
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> CaptureResult<usize> {
        if !self.running {
            return Err(CaptureError::NotStarted);
        }

        let block_align = self.format.block_align() as usize;
        let mut frames = buf.len() / block_align;
        if let Some(limit) = self.fail_after {
            let left = limit.saturating_sub(self.produced) as usize;
            if left < block_align {
                return Err(CaptureError::Device("simulated capture fault".to_string()));
            }
            frames = frames.min(left / block_align);
        }
        if frames == 0 {
            return Ok(0);
        }

        if self.realtime {
            let audio = Duration::from_secs_f64(frames as f64 / self.format.sample_rate as f64);
            tokio::time::sleep(audio.min(timeout)).await;
        }

        self.scratch.clear();
        let rate = self.format.sample_rate as f64;
        for _ in 0..frames {
            let t = self.position as f64 / rate;
            let value = self.amplitude * (TAU * self.frequency_hz * t).sin() as f32;
            for _ in 0..self.format.channels {
                encode_sample(value, self.format.bits_per_sample, &mut self.scratch);
            }
            self.position += 1;
        }

        let n = self.scratch.len();
        buf[..n].copy_from_slice(&self.scratch);
        self.produced += n as u64;
        Ok(n)
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        self.running = false;
        tracing::info!("Tone source stopped after {} bytes", self.produced);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::level::rms;

    fn format() -> AudioFormat {
        AudioFormat {
            sample_rate: 8000,
            channels: 2,
            bits_per_sample: 16,
        }
    }

    #[tokio::test]
    async fn test_read_requires_start() {
        let mut source = ToneSource::new(format(), 440.0);
        let mut buf = [0u8; 64];
        let err = source.read(&mut buf, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, CaptureError::NotStarted));
    }

    #[tokio::test]
    async fn test_reads_whole_frames() {
        let mut source = ToneSource::new(format(), 440.0);
        source.start().await.unwrap();

        let mut buf = [0u8; 1026];
        let n = source.read(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(n, 1024);

        // 0.5 amplitude sine has RMS 0.5/sqrt(2).
        let level = rms(&buf[..n], 16);
        assert!((level - 0.3536).abs() < 0.02, "level={level}");
    }

    #[tokio::test]
    async fn test_fail_after_limit() {
        let mut source = ToneSource::new(format(), 440.0).fail_after(100);
        source.start().await.unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(source.read(&mut buf, Duration::ZERO).await.unwrap(), 64);
        assert_eq!(source.read(&mut buf, Duration::ZERO).await.unwrap(), 36);
        assert!(matches!(
            source.read(&mut buf, Duration::ZERO).await,
            Err(CaptureError::Device(_))
        ));
        assert_eq!(source.produced(), 100);
    }
}
