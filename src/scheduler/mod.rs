//! Record/sync loop
//!
//! `RunControl` is the stop flag shared with whoever asks the device to stop;
//! `RecordSyncScheduler` owns everything else.

pub mod control;
pub mod runner;

pub use control::{RunControl, RunState};
pub use runner::{CycleReport, RecordSyncScheduler, SchedulerEvent};
