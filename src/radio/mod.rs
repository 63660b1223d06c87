//! Radio link contract
//!
//! The sync cycle powers the radio up with `connect`, and always powers it
//! down with `disconnect` before returning. Each link value owns its own
//! connection state and retry counter.

pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use probe::ProbeLink;

/// Radio errors
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Network stack not available: {0}")]
    StackUnavailable(String),

    #[error("Connect timed out after {0}ms")]
    Timeout(u64),

    #[error("Connect failed after {attempts} attempt(s): {reason}")]
    ConnectFailed { attempts: u32, reason: String },
}

/// Lifecycle of a radio link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Network stack not brought up yet
    Uninitialized,
    /// Stack ready, radio off
    Idle,
    /// Waiting for the link to come up
    Connecting,
    /// Link established
    Connected,
    /// Last connect attempt gave up
    Failed,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Connect/disconnect with a bounded wait
#[async_trait]
pub trait RadioLink: Send {
    /// Bring the link up, waiting no longer than the link's configured timeout
    async fn connect(&mut self) -> Result<(), RadioError>;

    /// Tear the link down and power the radio off
    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    fn state(&self) -> LinkState;
}
