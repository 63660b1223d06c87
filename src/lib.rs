//! Field Recorder - periodic audio clips with opportunistic WiFi sync.
//!
//! This is the library crate for the recorder. It wires the capture source,
//! recording writer, radio link and uploader into the record/sync loop.

pub mod capture;
pub mod config;
pub mod radio;
pub mod recorder;
pub mod scheduler;
pub mod status;
pub mod sync;
pub mod upload;
pub mod utils;

use capture::CaptureSource;
use config::DeviceConfig;
use radio::ProbeLink;
use recorder::RecordingWriter;
use scheduler::{RecordSyncScheduler, RunControl};
use status::LogIndicator;
use sync::SyncOrchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload::HttpUploadClient;
use utils::AppResult;

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "field_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the host collaborators from `config` and run the record/sync loop
///
/// Runs until `control` requests a stop, or for `cycles` cycles when given.
/// Returns the number of cycles that ran.
pub async fn run(
    config: DeviceConfig,
    source: Box<dyn CaptureSource>,
    control: RunControl,
    cycles: Option<u64>,
) -> AppResult<u64> {
    config.validate()?;
    tracing::info!("Starting Field Recorder v{}", env!("CARGO_PKG_VERSION"));

    let sync = config.sync;
    let radio = ProbeLink::new(
        &sync.server_base_url,
        sync.connect_timeout(),
        sync.association_retries,
    )?;
    let uploader = HttpUploadClient::new(sync.upload_timeout())?;
    let writer = RecordingWriter::new(config.recording, sync.recordings_dir.clone());
    let orchestrator = SyncOrchestrator::new(sync, Box::new(radio), Box::new(uploader));

    let mut scheduler = RecordSyncScheduler::new(
        writer,
        source,
        orchestrator,
        Box::new(LogIndicator::new()),
        config.cadence,
        control,
    );

    Ok(scheduler.run_for(cycles).await)
}
