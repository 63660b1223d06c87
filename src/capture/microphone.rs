//! Microphone capture via cpal
//!
//! The cpal stream lives on its own thread (streams are not `Send` on every
//! host). Its callback converts samples to the configured PCM format and
//! hands byte blocks to the async side through a bounded channel; blocks are
//! dropped, and counted, when the reader falls behind.

use super::pcm::{encode_sample, remap_frame};
use super::traits::{CaptureError, CaptureResult, CaptureSource};
use crate::recorder::AudioFormat;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Blocks buffered between the stream callback and `read`
const BLOCK_QUEUE_DEPTH: usize = 64;

/// Default input device, captured at a fixed format
pub struct MicrophoneSource {
    format: AudioFormat,
    device_name: Option<String>,
    is_recording: Arc<AtomicBool>,
    blocks_dropped: Arc<AtomicU64>,
    receiver: Option<mpsc::Receiver<Vec<u8>>>,
    pending: Vec<u8>,
    pending_pos: usize,
    stream_handle: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneSource {
    /// `device_name` selects an input device by name; `None` uses the default
    pub fn new(format: AudioFormat, device_name: Option<String>) -> Self {
        Self {
            format,
            device_name,
            is_recording: Arc::new(AtomicBool::new(false)),
            blocks_dropped: Arc::new(AtomicU64::new(0)),
            receiver: None,
            pending: Vec::new(),
            pending_pos: 0,
            stream_handle: None,
        }
    }

    /// Blocks discarded because the reader fell behind
    pub fn blocks_dropped(&self) -> u64 {
        self.blocks_dropped.load(Ordering::Relaxed)
    }

    fn find_device(&self) -> CaptureResult<cpal::Device> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceNotFound("default input".to_string())),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| CaptureError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(wanted.clone())),
        }
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.is_recording.store(false, Ordering::SeqCst);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    format: AudioFormat,
    is_recording: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let source_channels = config.channels as usize;
    let mut frame = Vec::with_capacity(format.channels as usize);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !is_recording.load(Ordering::Relaxed) {
                return;
            }
            let mut bytes = Vec::with_capacity(
                data.len() / source_channels.max(1) * format.block_align() as usize,
            );
            for chunk in data.chunks_exact(source_channels.max(1)) {
                let samples: Vec<f32> = chunk.iter().map(|&s| f32::from_sample(s)).collect();
                frame.clear();
                remap_frame(&samples, format.channels, &mut frame);
                for &value in &frame {
                    encode_sample(value, format.bits_per_sample, &mut bytes);
                }
            }
            if tx.try_send(bytes).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        },
        |err| tracing::error!("Microphone stream error: {}", err),
        None,
    )
}

#[async_trait]
impl CaptureSource for MicrophoneSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn start(&mut self) -> CaptureResult<()> {
        if self.is_recording.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStarted);
        }

        let device = self.find_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_config = device
            .default_input_config()
            .map_err(|e| CaptureError::Configuration(format!("Failed to get input config: {}", e)))?;

        let sample_format = default_config.sample_format();
        let stream_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(self.format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel(BLOCK_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();
        let is_recording = self.is_recording.clone();
        let dropped = self.blocks_dropped.clone();
        let format = self.format;

        is_recording.store(true, Ordering::SeqCst);

        let handle = std::thread::spawn(move || {
            let built = match sample_format {
                SampleFormat::F32 => build_stream::<f32>(
                    &device, &stream_config, format, is_recording.clone(), dropped, tx,
                ),
                SampleFormat::I16 => build_stream::<i16>(
                    &device, &stream_config, format, is_recording.clone(), dropped, tx,
                ),
                SampleFormat::I32 => build_stream::<i32>(
                    &device, &stream_config, format, is_recording.clone(), dropped, tx,
                ),
                SampleFormat::U16 => build_stream::<u16>(
                    &device, &stream_config, format, is_recording.clone(), dropped, tx,
                ),
                other => {
                    let _ = ready_tx.send(Err(format!("unsupported sample format {:?}", other)));
                    return;
                }
            };

            let stream = match built {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("failed to build input stream: {}", e)));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(format!("failed to start input stream: {}", e)));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            while is_recording.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
        });

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        match ready {
            Ok(Ok(())) => {
                self.receiver = Some(rx);
                self.stream_handle = Some(handle);
                tracing::info!(
                    "Microphone started: {} ({}Hz, {}ch in, {}ch out, {}bit)",
                    device_name,
                    self.format.sample_rate,
                    default_config.channels(),
                    self.format.channels,
                    self.format.bits_per_sample
                );
                Ok(())
            }
            Ok(Err(reason)) => {
                self.is_recording.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CaptureError::Configuration(reason))
            }
            Err(_) => {
                self.is_recording.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CaptureError::Device("stream thread exited".to_string()))
            }
        }
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> CaptureResult<usize> {
        let receiver = self.receiver.as_mut().ok_or(CaptureError::NotStarted)?;

        if self.pending_pos >= self.pending.len() {
            match tokio::time::timeout(timeout, receiver.recv()).await {
                Err(_) => return Ok(0),
                Ok(None) => return Err(CaptureError::Disconnected),
                Ok(Some(block)) => {
                    self.pending = block;
                    self.pending_pos = 0;
                }
            }
        }

        let available = &self.pending[self.pending_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;
        Ok(n)
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        self.is_recording.store(false, Ordering::SeqCst);
        self.receiver = None;
        self.pending.clear();
        self.pending_pos = 0;
        if let Some(handle) = self.stream_handle.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| CaptureError::Device(e.to_string()))?
                .map_err(|_| CaptureError::Device("stream thread panicked".to_string()))?;
        }
        let dropped = self.blocks_dropped();
        if dropped > 0 {
            tracing::warn!("Microphone dropped {} block(s) while capturing", dropped);
        }
        tracing::info!("Microphone stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }
}
