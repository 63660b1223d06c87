//! File upload contract
//!
//! One call is one blocking upload-and-response-read. A transport failure
//! is an `Err`; any HTTP status, including 4xx/5xx, is an `Ok`.

pub mod http;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use http::HttpUploadClient;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UploadError::Timeout
        } else {
            UploadError::Transport(error.to_string())
        }
    }
}

/// Whether a server status acknowledges delivery
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
pub trait UploadClient: Send {
    /// Upload `path` to `url` as multipart field `field_name`, returning the HTTP status
    async fn upload_file(
        &mut self,
        url: &str,
        path: &Path,
        field_name: &str,
    ) -> Result<u16, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(201));
        assert!(is_success_status(299));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
        assert!(!is_success_status(500));
    }
}
