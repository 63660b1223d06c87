//! Recording module
//!
//! Turns a capture source into numbered, self-describing WAV files:
//! - `RecordingWriter` runs one capture cycle per call
//! - `WavHeader` encodes and checks the container header
//! - `level` meters signal strength for the log

pub mod level;
pub mod state;
pub mod wav;
pub mod writer;

pub use state::{recording_file_name, AudioFormat, FinishReason, Recording};
pub use wav::{WavError, WavHeader};
pub use writer::{RecordingError, RecordingWriter};
