//! Device status indication
//!
//! On hardware this drives the addressable LED; on a host it goes to the log.

use serde::{Deserialize, Serialize};

/// What the device is doing, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Booting,
    Recording,
    Syncing,
    Idle,
    Error,
}

impl DeviceStatus {
    /// LED colour (r, g, b) for this status
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            DeviceStatus::Booting => (0, 0, 32),
            DeviceStatus::Recording => (32, 0, 0),
            DeviceStatus::Syncing => (0, 0, 64),
            DeviceStatus::Idle => (0, 16, 0),
            DeviceStatus::Error => (64, 16, 0),
        }
    }
}

pub trait StatusIndicator: Send {
    fn show(&mut self, status: DeviceStatus);

    fn current(&self) -> Option<DeviceStatus>;
}

/// Logs status changes instead of lighting an LED
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Option<DeviceStatus>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusIndicator for LogIndicator {
    fn show(&mut self, status: DeviceStatus) {
        if self.current == Some(status) {
            return;
        }
        let (r, g, b) = status.color();
        match status {
            DeviceStatus::Error => tracing::warn!(?status, r, g, b, "Status changed"),
            _ => tracing::info!(?status, r, g, b, "Status changed"),
        }
        self.current = Some(status);
    }

    fn current(&self) -> Option<DeviceStatus> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_indicator_tracks_current() {
        let mut indicator = LogIndicator::new();
        assert_eq!(indicator.current(), None);

        indicator.show(DeviceStatus::Recording);
        indicator.show(DeviceStatus::Recording);
        assert_eq!(indicator.current(), Some(DeviceStatus::Recording));

        indicator.show(DeviceStatus::Error);
        assert_eq!(indicator.current(), Some(DeviceStatus::Error));
    }
}
