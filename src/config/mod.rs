//! Device configuration
//!
//! Every tunable the firmware uses lives here, fixed at process start.
//! The on-disk form is a camelCase JSON document; any field left out takes
//! its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::recorder::AudioFormat;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// =============================================================================
// Sync
// =============================================================================

/// Parameters for the sync cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Server origin, e.g. `http://192.168.0.1:8081`
    pub server_base_url: String,

    /// Path appended to the base URL for uploads
    pub upload_path: String,

    /// Directory holding finished recordings
    pub recordings_dir: PathBuf,

    /// Ledger file listing delivered recordings
    pub ledger_path: PathBuf,

    /// Upload attempts per file (at least 1)
    pub max_retries: u8,

    /// Flat delay between attempts, in milliseconds
    pub retry_delay_ms: u64,

    /// Upper bound on a radio connect, in milliseconds
    pub connect_timeout_ms: u64,

    /// Extra association attempts the link makes inside one connect
    pub association_retries: u8,

    /// Per-attempt upload timeout, in milliseconds
    pub upload_timeout_ms: u64,

    /// Multipart field name the server expects the file under
    pub upload_field_name: String,

    /// Extension (without the dot) that marks a recording
    pub audio_extension: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_base_url: "http://192.168.0.1:8081".to_string(),
            upload_path: "/v1/recordings".to_string(),
            recordings_dir: PathBuf::from("/sdcard/recordings"),
            ledger_path: PathBuf::from("/sdcard/.processed"),
            max_retries: 3,
            retry_delay_ms: 5000,
            connect_timeout_ms: 30_000,
            association_retries: 4,
            upload_timeout_ms: 60_000,
            upload_field_name: "audio".to_string(),
            audio_extension: "wav".to_string(),
        }
    }
}

impl SyncConfig {
    /// Full upload URL
    pub fn upload_url(&self) -> String {
        format!(
            "{}{}",
            self.server_base_url.trim_end_matches('/'),
            self.upload_path
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_base_url.starts_with("http://")
            || self.server_base_url.starts_with("https://"))
        {
            return Err(invalid(
                "sync.serverBaseUrl",
                format!("'{}' is not an http(s) URL", self.server_base_url),
            ));
        }
        if !self.upload_path.starts_with('/') {
            return Err(invalid("sync.uploadPath", "must start with '/'"));
        }
        if self.max_retries == 0 {
            return Err(invalid("sync.maxRetries", "must be at least 1"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(invalid("sync.connectTimeoutMs", "must be non-zero"));
        }
        if self.upload_timeout_ms == 0 {
            return Err(invalid("sync.uploadTimeoutMs", "must be non-zero"));
        }
        if self.upload_field_name.is_empty() {
            return Err(invalid("sync.uploadFieldName", "must not be empty"));
        }
        if self.audio_extension.is_empty() || self.audio_extension.starts_with('.') {
            return Err(invalid(
                "sync.audioExtension",
                "must be non-empty and given without a leading dot",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Recording
// =============================================================================

/// Parameters for one capture cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    /// Samples per second, per channel
    pub sample_rate: u32,

    /// Interleaved channel count
    pub channels: u16,

    /// Bits per sample (8, 16, 24 or 32)
    pub bits_per_sample: u16,

    /// Clip length in seconds
    pub duration_secs: u32,

    /// Maximum bytes requested from the capture source per read, rounded
    /// down to whole frames
    pub chunk_size: usize,

    /// Capture read timeout, in milliseconds
    pub read_timeout_ms: u64,

    /// Consecutive empty reads after which the source is considered dead
    pub max_idle_reads: u32,

    /// Log progress and level every N chunks (0 disables)
    pub level_log_interval: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 2,
            bits_per_sample: 32,
            duration_secs: 10,
            chunk_size: 4096,
            read_timeout_ms: 1000,
            max_idle_reads: 30,
            level_log_interval: 10,
        }
    }
}

impl RecordingConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }

    /// Bytes of sample data in one full-length clip
    pub fn target_bytes(&self) -> u64 {
        self.format().byte_rate() as u64 * self.duration_secs as u64
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(invalid("recording.sampleRate", "must be non-zero"));
        }
        if self.channels == 0 {
            return Err(invalid("recording.channels", "must be non-zero"));
        }
        if !matches!(self.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(invalid(
                "recording.bitsPerSample",
                format!("{} is not one of 8, 16, 24, 32", self.bits_per_sample),
            ));
        }
        if self.duration_secs == 0 {
            return Err(invalid("recording.durationSecs", "must be non-zero"));
        }
        let format = self.format();
        let Some(block_align) = format.checked_block_align() else {
            return Err(invalid(
                "recording.channels",
                format!("{} channels overflow the frame size", self.channels),
            ));
        };
        if format.checked_byte_rate().is_none() {
            return Err(invalid(
                "recording.sampleRate",
                format!("{} Hz overflows the byte rate", self.sample_rate),
            ));
        }
        // The RIFF size fields are 32-bit.
        if self.target_bytes() > (u32::MAX - 36) as u64 {
            return Err(invalid(
                "recording.durationSecs",
                "clip would exceed the 4 GiB container limit",
            ));
        }
        let block_align = block_align as usize;
        if self.chunk_size < block_align {
            return Err(invalid(
                "recording.chunkSize",
                format!("must hold at least one frame ({} bytes)", block_align),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Cadence
// =============================================================================

/// When the scheduler runs a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum SyncCadence {
    /// One sync after every recording
    EveryRecording,
    /// Sync after a recording once this many seconds have passed since the last sync
    Interval { secs: u64 },
}

impl Default for SyncCadence {
    fn default() -> Self {
        Self::EveryRecording
    }
}

// =============================================================================
// Device
// =============================================================================

/// Complete device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub sync: SyncConfig,
    pub recording: RecordingConfig,
    pub cadence: SyncCadence,
}

impl DeviceConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DeviceConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given and present, otherwise use defaults
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!("No configuration at {:?}, using defaults", path);
                Self::load_or_default(None)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        self.recording.validate()?;
        if let SyncCadence::Interval { secs: 0 } = self.cadence {
            return Err(invalid("cadence.secs", "interval must be non-zero"));
        }
        Ok(())
    }
}
