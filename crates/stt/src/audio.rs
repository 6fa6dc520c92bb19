//! WAV loading and preprocessing
//!
//! Whisper consumes 16 kHz mono f32 samples; ffmpeg output normally already
//! matches, other WAV files are down-mixed and resampled here.

use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};
use transcribe_common::{Result, TranscribeError};

/// Sample rate Whisper expects
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Audio buffer (f32 samples, interleaved when multi-channel)
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Get duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.channels as f32 / self.sample_rate as f32
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(mut self) -> Self {
        if self.channels <= 1 {
            return self;
        }

        info!("Converting {} channel audio to mono", self.channels);

        let channels = self.channels as usize;
        self.samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        self.channels = 1;
        self
    }

    /// Resample to target sample rate
    ///
    /// Linear interpolation; enough for speech going into Whisper.
    pub fn resample(mut self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            self.sample_rate = target_rate;
            return self;
        }

        info!("Resampling from {}Hz to {}Hz", self.sample_rate, target_rate);

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let new_length = (self.samples.len() as f64 / ratio) as usize;
        let last = self.samples.len() - 1;
        let mut resampled = Vec::with_capacity(new_length);

        for i in 0..new_length {
            let src_index = i as f64 * ratio;
            let floor = (src_index.floor() as usize).min(last);
            let ceil = (floor + 1).min(last);
            let fraction = (src_index - floor as f64) as f32;

            resampled.push(self.samples[floor] * (1.0 - fraction) + self.samples[ceil] * fraction);
        }

        self.samples = resampled;
        self.sample_rate = target_rate;
        self
    }

    /// Mono 16 kHz, ready for inference
    pub fn into_whisper_input(self) -> Self {
        self.to_mono().resample(WHISPER_SAMPLE_RATE)
    }
}

/// Load a WAV file into an [`AudioBuffer`]
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    let data = std::fs::read(path).map_err(|e| {
        TranscribeError::stt(format!("Failed to open WAV file {}: {}", path.display(), e))
    })?;

    let buffer = parse_wav(&data)?;
    info!(
        "Loaded {} samples ({:.1}s) from {}",
        buffer.samples.len(),
        buffer.duration(),
        path.display()
    );

    Ok(buffer)
}

/// Parse in-memory WAV bytes (integer PCM up to 32-bit or 32-bit float)
pub fn parse_wav(data: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(data))
        .map_err(|e| TranscribeError::stt(format!("Invalid WAV data: {}", e)))?;
    read_wav(reader)
}

fn read_wav<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    debug!(
        "WAV file info: {}Hz, {} channels, {} bits, {:?}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(TranscribeError::stt("WAV header declares no channels or sample rate"));
    }

    let samples: std::result::Result<Vec<f32>, _> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect(),
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / scale))
                .collect()
        }
        (format, bits) => {
            return Err(TranscribeError::stt(format!(
                "Unsupported WAV encoding: {:?} with {} bits per sample",
                format, bits
            )))
        }
    };

    let samples = samples.map_err(|e| TranscribeError::stt(format!("WAV sample error: {}", e)))?;
    Ok(AudioBuffer::new(samples, spec.sample_rate, spec.channels))
}
