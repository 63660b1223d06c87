//! Run/stop flag shared with the console listener
//!
//! The only state crossing tasks is a single atomic byte.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const STATE_RUNNING: u8 = 0;
const STATE_STOP_REQUESTED: u8 = 1;

/// Observed value of the flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    StopRequested,
}

/// Cloneable handle to the run flag
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    state: Arc<AtomicU8>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => RunState::Running,
            _ => RunState::StopRequested,
        }
    }

    /// Ask the loop to stop at its next checkpoint
    pub fn request_stop(&self) {
        if self.state.swap(STATE_STOP_REQUESTED, Ordering::SeqCst) == STATE_RUNNING {
            tracing::info!("Stop requested");
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.state() == RunState::StopRequested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let control = RunControl::new();
        let listener = control.clone();
        assert_eq!(control.state(), RunState::Running);

        listener.request_stop();
        assert!(control.stop_requested());

        // Idempotent
        listener.request_stop();
        assert_eq!(control.state(), RunState::StopRequested);
    }
}
