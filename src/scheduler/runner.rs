//! Record/sync scheduler
//!
//! Alternates one recording with one sync cycle, forever or until a stop is
//! requested. The phases never overlap: a recording is finalized on storage
//! before the radio is touched.

use super::control::RunControl;
use crate::capture::CaptureSource;
use crate::config::SyncCadence;
use crate::recorder::{Recording, RecordingWriter};
use crate::status::{DeviceStatus, StatusIndicator};
use crate::sync::{SyncCycleResult, SyncOrchestrator, SyncStatus};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Pause after a failed recording or capture start
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Events emitted by the scheduler
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A recording was finalized
    RecordingFinished(Recording),
    /// A recording could not be produced
    RecordingFailed(String),
    /// A sync cycle ran
    SyncFinished(SyncCycleResult),
    /// The loop exited
    Stopped { cycles: u64 },
}

/// What one scheduler cycle produced
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub recording: Option<Recording>,
    pub sync: Option<SyncCycleResult>,
}

pub struct RecordSyncScheduler {
    writer: RecordingWriter,
    source: Box<dyn CaptureSource>,
    orchestrator: SyncOrchestrator,
    indicator: Box<dyn StatusIndicator>,
    cadence: SyncCadence,
    control: RunControl,
    last_sync: Option<Instant>,
    cycles: u64,
    event_tx: broadcast::Sender<SchedulerEvent>,
}

impl RecordSyncScheduler {
    pub fn new(
        writer: RecordingWriter,
        source: Box<dyn CaptureSource>,
        orchestrator: SyncOrchestrator,
        indicator: Box<dyn StatusIndicator>,
        cadence: SyncCadence,
        control: RunControl,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            writer,
            source,
            orchestrator,
            indicator,
            cadence,
            control,
            last_sync: None,
            cycles: 0,
            event_tx,
        }
    }

    /// Subscribe to scheduler events
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_tx.subscribe()
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Cycles run so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    fn sync_due(&self) -> bool {
        match self.cadence {
            SyncCadence::EveryRecording => true,
            SyncCadence::Interval { secs } => self
                .last_sync
                .map_or(true, |at| at.elapsed() >= Duration::from_secs(secs)),
        }
    }

    /// Record one clip, then sync if the cadence says so
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        tracing::info!("--- Cycle {} ---", self.cycles);

        self.indicator.show(DeviceStatus::Recording);
        let recording = match self
            .writer
            .record(self.source.as_mut(), &self.control)
            .await
        {
            Ok(recording) => {
                let _ = self
                    .event_tx
                    .send(SchedulerEvent::RecordingFinished(recording.clone()));
                Some(recording)
            }
            Err(e) => {
                tracing::error!("Recording failed: {}", e);
                self.indicator.show(DeviceStatus::Error);
                let _ = self
                    .event_tx
                    .send(SchedulerEvent::RecordingFailed(e.to_string()));
                tokio::time::sleep(ERROR_BACKOFF).await;
                None
            }
        };

        if self.control.stop_requested() {
            tracing::info!("Stop requested, skipping sync");
            return CycleReport {
                recording,
                sync: None,
            };
        }

        let sync = if self.sync_due() {
            tracing::info!("--- Performing sync ---");
            self.indicator.show(DeviceStatus::Syncing);
            let result = self.orchestrator.run_cycle().await;
            self.last_sync = Some(Instant::now());
            let _ = self.event_tx.send(SchedulerEvent::SyncFinished(result));
            Some(result)
        } else {
            tracing::debug!("Sync not due yet");
            None
        };

        let healthy =
            recording.is_some() && sync.map_or(true, |s| s.status == SyncStatus::Complete);
        self.indicator.show(if healthy {
            DeviceStatus::Idle
        } else {
            DeviceStatus::Error
        });

        CycleReport { recording, sync }
    }

    /// Run until a stop is requested
    pub async fn run(&mut self) -> u64 {
        self.run_for(None).await
    }

    /// Run at most `max_cycles` cycles (unbounded for `None`), returning how many ran
    pub async fn run_for(&mut self, max_cycles: Option<u64>) -> u64 {
        self.indicator.show(DeviceStatus::Booting);
        if let Err(e) = self.writer.resume_sequence() {
            tracing::warn!(
                "Could not scan {:?} for existing recordings: {}",
                self.writer.dir(),
                e
            );
        }

        let mut completed = 0;
        if self.start_source().await {
            while !self.control.stop_requested() && max_cycles.map_or(true, |m| completed < m) {
                self.run_cycle().await;
                completed += 1;
            }

            if let Err(e) = self.source.stop().await {
                tracing::warn!("Failed to stop capture source: {}", e);
            }
        }

        self.indicator.show(DeviceStatus::Idle);
        tracing::info!("Scheduler stopped after {} cycle(s)", completed);
        let _ = self.event_tx.send(SchedulerEvent::Stopped { cycles: completed });
        completed
    }

    /// Start the capture source, retrying until it starts or a stop is requested
    async fn start_source(&mut self) -> bool {
        loop {
            if self.control.stop_requested() {
                return false;
            }
            match self.source.start().await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::error!("Failed to start capture source: {}", e);
                    self.indicator.show(DeviceStatus::Error);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }
}
