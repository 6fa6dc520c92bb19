use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use transcribe_common::{Result, TranscribeError};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use crate::audio::{self, WHISPER_SAMPLE_RATE};
use crate::postprocess::{self, TimedToken};
use crate::types::{Segment, Transcription, TranscriptionOptions};
use crate::Transcriber;

/// GPU 디바이스 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuDevice {
    /// CUDA (NVIDIA GPU)
    Cuda,
    /// Metal (Apple GPU)
    Metal,
    /// CPU만 사용
    Cpu,
}

/// Whisper STT Engine
///
/// The model is loaded once; every call to [`WhisperEngine::transcribe`]
/// creates its own decoding state, so one engine serves concurrent requests.
pub struct WhisperEngine {
    ctx: Arc<WhisperContext>,
    model_path: String,
    gpu_device: GpuDevice,
}

impl WhisperEngine {
    /// 사용 가능한 GPU 디바이스 감지 (우선순위: CUDA > Metal > CPU)
    ///
    /// CUDA/Metal 지원 여부는 feature flag로 제어합니다.
    fn detect_gpu_device() -> GpuDevice {
        if cfg!(feature = "cuda") {
            GpuDevice::Cuda
        } else if cfg!(feature = "metal") {
            GpuDevice::Metal
        } else {
            GpuDevice::Cpu
        }
    }

    /// Create a new Whisper engine from model path
    ///
    /// # Example
    /// ```no_run
    /// use transcribe_stt::WhisperEngine;
    ///
    /// let engine = WhisperEngine::new("models/ggml-base.bin").unwrap();
    /// ```
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(TranscribeError::stt(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| TranscribeError::stt(format!("Model path is not UTF-8: {}", path.display())))?;

        let gpu_device = Self::detect_gpu_device();
        info!("Loading Whisper model from {} on {:?}", path.display(), gpu_device);

        let ctx = match WhisperContext::new_with_params(path_str, WhisperContextParameters::default()) {
            Ok(ctx) => ctx,
            Err(e) if gpu_device != GpuDevice::Cpu => {
                // GPU 초기화 실패 시 CPU로 fallback
                warn!("Failed to load model with GPU ({:?}): {}", gpu_device, e);
                warn!("Falling back to CPU");

                let mut cpu_params = WhisperContextParameters::default();
                cpu_params.use_gpu(false);

                WhisperContext::new_with_params(path_str, cpu_params).map_err(|e| {
                    TranscribeError::stt(format!("Failed to load Whisper model even with CPU: {}", e))
                })?
            }
            Err(e) => {
                return Err(TranscribeError::stt(format!("Failed to load Whisper model: {}", e)));
            }
        };

        info!("Whisper model loaded successfully");

        Ok(Self {
            ctx: Arc::new(ctx),
            model_path: path.to_string_lossy().to_string(),
            gpu_device,
        })
    }

    /// Transcribe a WAV file
    ///
    /// # Arguments
    /// * `audio_path` - WAV file, ideally 16 kHz mono
    /// * `options` - Transcription options
    pub fn transcribe(
        &self,
        audio_path: impl AsRef<Path>,
        options: &TranscriptionOptions,
    ) -> Result<Transcription> {
        let path = audio_path.as_ref();

        if !path.exists() {
            return Err(TranscribeError::stt(format!(
                "Audio file not found: {}",
                path.display()
            )));
        }

        info!("Transcribing audio file: {}", path.display());

        let audio = audio::load_wav(path)?.into_whisper_input();
        let duration = audio.samples.len() as f32 / WHISPER_SAMPLE_RATE as f32;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: options.beam_size.max(1),
            patience: -1.0,
        });

        params.set_language(Some(options.language.as_deref().unwrap_or("auto")));
        params.set_n_threads(options.threads.max(1));
        params.set_token_timestamps(options.word_timestamps);
        params.set_no_speech_thold(options.no_speech_threshold);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscribeError::stt(format!("Failed to create Whisper state: {}", e)))?;

        debug!("Starting Whisper inference on {:.1}s of audio", duration);
        state
            .full(params, &audio.samples)
            .map_err(|e| TranscribeError::stt(format!("Transcription failed: {}", e)))?;

        let language = match &options.language {
            Some(lang) => lang.clone(),
            None => detected_language(&state),
        };

        let segments = collect_segments(&state, options)?;

        info!(
            "Transcription successful: {} segments, language {}, {:.1}s",
            segments.len(),
            language,
            duration
        );

        Ok(Transcription::new(duration, language, segments))
    }

    /// Get model path
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Get GPU device being used
    pub fn gpu_device(&self) -> GpuDevice {
        self.gpu_device
    }
}

impl Transcriber for WhisperEngine {
    fn transcribe(&self, audio_path: &Path, options: &TranscriptionOptions) -> Result<Transcription> {
        WhisperEngine::transcribe(self, audio_path, options)
    }
}

fn detected_language(state: &WhisperState) -> String {
    state
        .full_lang_id_from_state()
        .ok()
        .and_then(whisper_rs::get_lang_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read segments (and word timings) out of a finished decoding state
fn collect_segments(state: &WhisperState, options: &TranscriptionOptions) -> Result<Vec<Segment>> {
    let num_segments = state
        .full_n_segments()
        .map_err(|e| TranscribeError::stt(format!("Failed to get segment count: {}", e)))?;

    debug!("Transcription complete, {} segments found", num_segments);

    let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

    for i in 0..num_segments {
        let raw_text = state
            .full_get_segment_text(i)
            .map_err(|e| TranscribeError::stt(format!("Failed to get segment text: {}", e)))?;
        let t0 = state
            .full_get_segment_t0(i)
            .map_err(|e| TranscribeError::stt(format!("Failed to get segment start time: {}", e)))?;
        let t1 = state
            .full_get_segment_t1(i)
            .map_err(|e| TranscribeError::stt(format!("Failed to get segment end time: {}", e)))?;

        let text = postprocess::normalize_text(&raw_text);
        if text.is_empty() {
            continue;
        }
        if options.suppress_repetitions && postprocess::is_repetitive(&text) {
            continue;
        }

        let words = if options.word_timestamps {
            postprocess::group_words(&segment_tokens(state, i)?)
        } else {
            Vec::new()
        };

        // Timestamps are in centiseconds; ids stay contiguous after filtering
        segments.push(
            Segment::new(segments.len(), centis_to_secs(t0), centis_to_secs(t1), text).with_words(words),
        );
    }

    Ok(segments)
}

fn segment_tokens(state: &WhisperState, segment: i32) -> Result<Vec<TimedToken>> {
    let n_tokens = state
        .full_n_tokens(segment)
        .map_err(|e| TranscribeError::stt(format!("Failed to get token count: {}", e)))?;

    let mut tokens = Vec::with_capacity(n_tokens.max(0) as usize);
    for j in 0..n_tokens {
        // Tokens that split a multi-byte character are not valid UTF-8 on their own
        let text = match state.full_get_token_text(segment, j) {
            Ok(text) => text,
            Err(e) => {
                debug!("Skipping token {}:{}: {}", segment, j, e);
                continue;
            }
        };
        let data = state
            .full_get_token_data(segment, j)
            .map_err(|e| TranscribeError::stt(format!("Failed to get token data: {}", e)))?;

        tokens.push(TimedToken::new(text, centis_to_secs(data.t0), centis_to_secs(data.t1)));
    }

    Ok(tokens)
}

fn centis_to_secs(centis: i64) -> f32 {
    centis.max(0) as f32 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation_with_missing_model() {
        let result = WhisperEngine::new("nonexistent_model.bin");
        assert!(result.is_err());
    }

    #[test]
    fn test_centis_to_secs() {
        assert_eq!(centis_to_secs(150), 1.5);
        assert_eq!(centis_to_secs(-3), 0.0);
    }

    #[test]
    fn test_cpu_without_gpu_features() {
        if !cfg!(feature = "cuda") && !cfg!(feature = "metal") {
            assert_eq!(WhisperEngine::detect_gpu_device(), GpuDevice::Cpu);
        }
    }
}
