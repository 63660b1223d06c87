//! Recording writer
//!
//! Produces one WAV file per call. The header is written as a placeholder,
//! sample data is streamed in bounded chunks, and the header is patched with
//! the true size once capture ends, whatever the reason it ended.

use super::level::{level_meter, rms};
use super::state::{parse_sequence, recording_file_name, AudioFormat, FinishReason, Recording};
use super::wav::{WavHeader, HEADER_LEN};
use crate::capture::CaptureSource;
use crate::config::RecordingConfig;
use crate::scheduler::RunControl;
use chrono::Utc;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Recording errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source format {source_format} does not match configured {configured}")]
    FormatMismatch {
        source_format: String,
        configured: String,
    },
}

/// Writes capture cycles to numbered WAV files
pub struct RecordingWriter {
    config: RecordingConfig,
    dir: PathBuf,
    next_sequence: u32,
    buffer: Vec<u8>,
}

impl RecordingWriter {
    pub fn new(config: RecordingConfig, dir: impl Into<PathBuf>) -> Self {
        let buffer = vec![0u8; config.chunk_size];
        Self {
            config,
            dir: dir.into(),
            next_sequence: 0,
            buffer,
        }
    }

    /// Sequence number the next recording will use
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Continue numbering after the highest recording already on storage
    pub fn resume_sequence(&mut self) -> std::io::Result<u32> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.next_sequence = 0;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut highest: Option<u32> = None;
        for entry in entries {
            let entry = entry?;
            if let Some(seq) = entry.file_name().to_str().and_then(parse_sequence) {
                highest = Some(highest.map_or(seq, |h| h.max(seq)));
            }
        }

        self.next_sequence = highest.map_or(0, |h| h.saturating_add(1));
        tracing::info!(
            "Next recording sequence: {} ({} existing)",
            self.next_sequence,
            if highest.is_some() { "found" } else { "none" }
        );
        Ok(self.next_sequence)
    }

    /// Capture one clip from `source` and finalize it on storage
    ///
    /// A capture error, a stalled source or a stop request ends capture
    /// early; the file is still finalized with the bytes captured so far.
    /// Storage errors are returned after a best-effort finalize.
    pub async fn record(
        &mut self,
        source: &mut dyn CaptureSource,
        control: &RunControl,
    ) -> Result<Recording, RecordingError> {
        let format = self.config.format();
        if source.format() != format {
            return Err(RecordingError::FormatMismatch {
                source_format: format!("{:?}", source.format()),
                configured: format!("{:?}", format),
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let sequence = self.next_sequence;
        let file_name = recording_file_name(sequence);
        let path = self.dir.join(&file_name);
        let mut file = File::create(&path).await?;
        self.next_sequence = sequence.saturating_add(1);

        let target = self.config.target_bytes();
        let started_at = Utc::now();
        tracing::info!(
            "Starting recording {}: {:?} ({} bytes target)",
            sequence,
            path,
            target
        );

        file.write_all(&WavHeader::new(format, 0).to_bytes()).await?;

        let timeout = self.config.read_timeout();
        let block_align = (format.block_align() as usize).max(1);
        let read_cap = (self.buffer.len() / block_align * block_align).max(block_align);
        if self.buffer.len() < read_cap {
            self.buffer.resize(read_cap, 0);
        }
        let mut written: u64 = 0;
        let mut chunks: u32 = 0;
        let mut idle_reads: u32 = 0;
        let mut finish = FinishReason::Completed;
        let mut write_error: Option<std::io::Error> = None;

        while written < target {
            if control.stop_requested() {
                finish = FinishReason::StopRequested;
                break;
            }

            let want = (target - written).min(read_cap as u64) as usize;
            match source.read(&mut self.buffer[..want], timeout).await {
                Ok(0) => {
                    idle_reads += 1;
                    if idle_reads > self.config.max_idle_reads {
                        tracing::error!(
                            "Capture source idle for {} reads, abandoning recording {}",
                            idle_reads,
                            sequence
                        );
                        finish = FinishReason::Stalled;
                        break;
                    }
                }
                Ok(n) => {
                    idle_reads = 0;
                    let n = n.min(want);
                    if let Err(e) = file.write_all(&self.buffer[..n]).await {
                        tracing::error!("Write failed for {:?}: {}", path, e);
                        write_error = Some(e);
                        break;
                    }
                    written += n as u64;

                    let interval = self.config.level_log_interval;
                    if interval > 0 && chunks % interval == 0 {
                        let level = rms(&self.buffer[..n], format.bits_per_sample);
                        tracing::info!(
                            "Recording progress: {:.1}%",
                            written as f64 / target as f64 * 100.0
                        );
                        tracing::info!("Level: {}", level_meter(level));
                    }
                    chunks += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to read from capture source: {}", e);
                    finish = FinishReason::CaptureFailed;
                    break;
                }
            }
        }

        // A short read can end mid-frame; only whole frames are kept.
        let partial = written % block_align as u64;
        if partial != 0 {
            tracing::debug!("Dropping {} byte(s) of a partial frame", partial);
            written -= partial;
        }

        let finalized = finalize(&mut file, format, written).await;
        if let Some(e) = write_error {
            if let Err(fe) = finalized {
                tracing::error!("Finalize after write failure also failed: {}", fe);
            }
            return Err(e.into());
        }
        finalized?;

        let recording = Recording {
            sequence,
            file_name,
            path,
            format,
            data_bytes: written,
            target_bytes: target,
            started_at,
            finish,
        };

        if recording.is_complete() {
            tracing::info!(
                "Recording complete: {:?} ({} bytes)",
                recording.path,
                written
            );
        } else {
            tracing::warn!(
                "Recording ended early ({:?}): {:?} ({} of {} bytes)",
                finish,
                recording.path,
                written,
                target
            );
        }
        Ok(recording)
    }
}

/// Patch the header with the captured size and flush to storage
async fn finalize(
    file: &mut File,
    format: AudioFormat,
    data_bytes: u64,
) -> std::io::Result<()> {
    let data_len = u32::try_from(data_bytes).unwrap_or(u32::MAX - HEADER_LEN as u32);
    let header = WavHeader::new(format, data_len);

    file.flush().await?;
    file.set_len(header.file_len()).await?;
    file.seek(SeekFrom::Start(0)).await?;
    file.write_all(&header.to_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
