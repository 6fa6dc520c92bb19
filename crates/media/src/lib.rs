//! Media conversion through the ffmpeg command line
//!
//! WAV extraction for speech recognition and HLS packaging for streaming.

pub mod ffmpeg;
pub mod hls;

pub use ffmpeg::Ffmpeg;
pub use hls::{content_type_for, HLS_PLAYLIST};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use transcribe_common::Result;

/// Conversions the processing pipeline needs from a media toolkit
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Decode `input` into 16 kHz mono PCM16 WAV at `output`
    async fn convert_to_wav(&self, input: &Path, output: &Path) -> Result<()>;

    /// Package `input` as HLS into `out_dir`, returning every produced file
    async fn package_hls(&self, input: &Path, out_dir: &Path, segment_seconds: u32)
        -> Result<Vec<PathBuf>>;
}
