//! Recording metadata
//!
//! Describes a finished capture file and the audio format it was written in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filename prefix for recordings
pub const RECORDING_PREFIX: &str = "rec_";

/// Filename extension for recordings
pub const RECORDING_EXTENSION: &str = "wav";

/// PCM format of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// Samples per second, per channel
    pub sample_rate: u32,

    /// Interleaved channel count
    pub channels: u16,

    /// Bits per sample
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Bytes per interleaved frame, `None` if it does not fit the header field
    pub fn checked_block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second of audio, `None` if it does not fit the header field
    pub fn checked_byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.checked_block_align()? as u32)
    }

    /// Bytes per interleaved frame (saturating)
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second of audio (saturating)
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    /// Playback duration of `bytes` of sample data, in milliseconds
    pub fn duration_ms(&self, bytes: u64) -> u64 {
        match self.byte_rate() {
            0 => 0,
            rate => bytes * 1000 / rate as u64,
        }
    }
}

/// Why capture for a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    /// Target length reached
    Completed,
    /// The capture source reported an unrecoverable read error
    CaptureFailed,
    /// The capture source stopped delivering data
    Stalled,
    /// A stop was requested while capturing
    StopRequested,
}

/// A finalized recording on storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Monotonic sequence number
    pub sequence: u32,

    /// Bare filename, e.g. `rec_00042.wav`
    pub file_name: String,

    /// Full storage path
    pub path: PathBuf,

    /// Sample format written to the header
    pub format: AudioFormat,

    /// Bytes of sample data actually captured
    pub data_bytes: u64,

    /// Bytes of sample data a full-length clip would hold
    pub target_bytes: u64,

    /// Wall-clock time capture started
    pub started_at: DateTime<Utc>,

    /// How capture ended
    pub finish: FinishReason,
}

impl Recording {
    /// Whether the clip reached its full length
    pub fn is_complete(&self) -> bool {
        self.finish == FinishReason::Completed
    }

    /// Captured audio length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.format.duration_ms(self.data_bytes)
    }
}

/// Zero-padded filename for a sequence number
pub fn recording_file_name(sequence: u32) -> String {
    format!("{}{:05}.{}", RECORDING_PREFIX, sequence, RECORDING_EXTENSION)
}

/// Sequence number encoded in a recording filename, if it is one
pub fn parse_sequence(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(RECORDING_PREFIX)?
        .strip_suffix(RECORDING_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
