//! Speech-to-text on top of whisper.cpp
//!
//! WAV loading, Whisper inference and transcript shaping.

pub mod audio;
pub mod postprocess;
pub mod types;
pub mod whisper;

// Re-export main types
pub use types::{Segment, Transcription, TranscriptionOptions, Word};
pub use whisper::{GpuDevice, WhisperEngine};

use std::path::Path;
use transcribe_common::Result;

/// Blocking speech recognizer
///
/// Implementations are CPU-bound; async callers should run them on a
/// blocking thread pool.
pub trait Transcriber: Send + Sync {
    /// Transcribe a 16 kHz mono WAV file
    fn transcribe(&self, audio_path: &Path, options: &TranscriptionOptions) -> Result<Transcription>;
}
