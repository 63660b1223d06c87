//! Error types and handling
//!
//! Common error types used across the firmware.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::radio::RadioError;
use crate::recorder::RecordingError;
use crate::sync::LedgerError;
use crate::upload::UploadError;

/// Firmware-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl AppError {
    /// Short machine-readable code, logged alongside fatal errors
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Ledger(_) => "LEDGER_ERROR",
            AppError::Radio(_) => "RADIO_ERROR",
            AppError::Upload(_) => "UPLOAD_ERROR",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
