//! Field Recorder binary

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use field_recorder::capture::{CaptureSource, ToneSource};
use field_recorder::config::DeviceConfig;
use field_recorder::scheduler::RunControl;
use std::io::BufRead;
use std::path::PathBuf;

/// Test tone pitch for the synthetic source
const TONE_HZ: f64 = 440.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Synthetic sine wave paced to the sample clock
    Tone,
    /// Default input device (needs the `microphone` feature)
    Microphone,
}

#[derive(Parser, Debug)]
#[command(name = "field-recorder", version)]
#[command(about = "Record audio clips and sync them over WiFi", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where audio comes from
    #[arg(long, value_enum, default_value_t = SourceKind::Tone)]
    source: SourceKind,

    /// Override the recordings directory
    #[arg(long)]
    recordings_dir: Option<PathBuf>,

    /// Override the server base URL
    #[arg(long)]
    server: Option<String>,

    /// Run this many cycles and exit
    #[arg(long)]
    cycles: Option<u64>,

    /// Do not listen for "stop" on stdin
    #[arg(long)]
    no_console: bool,
}

fn build_source(kind: SourceKind, config: &DeviceConfig) -> anyhow::Result<Box<dyn CaptureSource>> {
    let format = config.recording.format();
    match kind {
        SourceKind::Tone => Ok(Box::new(ToneSource::new(format, TONE_HZ).realtime())),
        #[cfg(feature = "microphone")]
        SourceKind::Microphone => Ok(Box::new(
            field_recorder::capture::MicrophoneSource::new(format, None),
        )),
        #[cfg(not(feature = "microphone"))]
        SourceKind::Microphone => {
            bail!("microphone capture is not compiled in; rebuild with --features microphone")
        }
    }
}

/// Read stdin lines and request a stop on "stop" or "q"
///
/// Runs on a plain thread: a blocked stdin read must not hold up runtime shutdown.
fn spawn_console_listener(control: RunControl) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            tracing::info!("Type 'stop' and press Enter to stop");
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => match line.trim() {
                        "stop" | "q" => {
                            control.request_stop();
                            break;
                        }
                        "" => {}
                        other => tracing::debug!("Ignoring console input {:?}", other),
                    },
                    Err(e) => {
                        tracing::warn!("Console read failed: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    field_recorder::init_tracing();
    let cli = Cli::parse();

    let mut config = DeviceConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(dir) = cli.recordings_dir {
        config.sync.recordings_dir = dir;
    }
    if let Some(server) = cli.server {
        config.sync.server_base_url = server;
    }
    if cli.cycles == Some(0) {
        bail!("--cycles must be at least 1");
    }

    let source = build_source(cli.source, &config)?;
    let control = RunControl::new();

    if !cli.no_console {
        spawn_console_listener(control.clone()).context("failed to start console listener")?;
    }

    let ctrl_c = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.request_stop();
        }
    });

    let cycles = match field_recorder::run(config, source, control, cli.cycles).await {
        Ok(cycles) => cycles,
        Err(e) => {
            tracing::error!(code = e.code(), "Recorder failed to start: {}", e);
            return Err(e).context("recorder failed to start");
        }
    };
    tracing::info!("Exiting after {} cycle(s)", cycles);
    Ok(())
}
