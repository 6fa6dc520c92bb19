use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use transcribe_common::{AppConfig, Result, TranscribeError};
use transcribe_media::{content_type_for, MediaProcessor, HLS_PLAYLIST};
use transcribe_storage::{join_object_path, strip_bucket_prefix, ObjectStorage};
use transcribe_stt::{Transcriber, Transcription, TranscriptionOptions};

use crate::job_manager::JobManager;
use crate::types::{ProcessJob, ProcessResponse, TaskStage};

pub const TRANSCRIPT_JSON: &str = "transcript.json";
pub const TRANSCRIPT_TXT: &str = "transcript.txt";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const INPUT_DIR: &str = "input";
const WAV_FILE: &str = "audio.wav";
const HLS_DIR: &str = "hls";

/// Download → convert → transcribe → HLS → upload
pub struct ProcessingPipeline {
    storage: Arc<dyn ObjectStorage>,
    media: Arc<dyn MediaProcessor>,
    transcriber: Arc<dyn Transcriber>,
    config: AppConfig,
    job_manager: Arc<JobManager>,
}

impl ProcessingPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        media: Arc<dyn MediaProcessor>,
        transcriber: Arc<dyn Transcriber>,
        config: AppConfig,
        job_manager: Arc<JobManager>,
    ) -> Self {
        Self {
            storage,
            media,
            transcriber,
            config,
            job_manager,
        }
    }

    /// Run one job inside a fresh scratch directory
    ///
    /// The scratch directory is removed when this returns, on success or failure.
    pub async fn execute(&self, task_id: &str, job: &ProcessJob) -> Result<ProcessResponse> {
        let scratch = tempfile::Builder::new()
            .prefix("transcribe-")
            .tempdir_in(&self.config.work_dir)
            .map_err(|e| {
                TranscribeError::internal(format!(
                    "Failed to create scratch directory in {}: {}",
                    self.config.work_dir.display(),
                    e
                ))
            })?;
        let workdir = scratch.path();

        // Phase 1: fetch source media
        self.job_manager.advance(task_id, TaskStage::Downloading).await;
        let object_path = strip_bucket_prefix(&job.raw_path, &self.config.raw_bucket);
        // Own directory: no object name can collide with `audio.wav` or `hls`
        let input_dir = workdir.join(INPUT_DIR);
        tokio::fs::create_dir(&input_dir).await?;
        let input = input_dir.join(local_file_name(object_path));
        self.storage
            .download(&self.config.raw_bucket, object_path, &input)
            .await?;

        // Phase 2: 16 kHz mono WAV
        self.job_manager.advance(task_id, TaskStage::Converting).await;
        let wav = workdir.join(WAV_FILE);
        self.media.convert_to_wav(&input, &wav).await?;

        // Phase 3: speech-to-text
        self.job_manager.advance(task_id, TaskStage::Transcribing).await;
        let transcription = self.transcribe(&wav).await?;
        info!(
            "Task {}: {} segments, {:.1}s, language {}",
            task_id,
            transcription.segments.len(),
            transcription.duration,
            transcription.language
        );

        // Phase 4: HLS rendition of the original media
        self.job_manager.advance(task_id, TaskStage::Packaging).await;
        let hls_dir = workdir.join(HLS_DIR);
        let hls_files = self
            .media
            .package_hls(&input, &hls_dir, self.config.hls_segment_seconds)
            .await?;

        // Phase 5: publish
        self.job_manager.advance(task_id, TaskStage::Uploading).await;
        let prefix = job.processed_prefix.as_str();

        for file in &hls_files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping HLS output with non UTF-8 name: {}", file.display());
                continue;
            };
            self.storage
                .upload_file(
                    &self.config.processed_bucket,
                    &join_object_path(prefix, name),
                    file,
                    content_type_for(name),
                )
                .await?;
        }

        let transcript_json = join_object_path(prefix, TRANSCRIPT_JSON);
        let transcript_txt = join_object_path(prefix, TRANSCRIPT_TXT);

        self.storage
            .upload(
                &self.config.transcripts_bucket,
                &transcript_json,
                serde_json::to_vec(&transcription)?,
                JSON_CONTENT_TYPE,
            )
            .await?;
        self.storage
            .upload(
                &self.config.transcripts_bucket,
                &transcript_txt,
                transcription.to_text().into_bytes(),
                TEXT_CONTENT_TYPE,
            )
            .await?;

        Ok(ProcessResponse {
            processed_path: join_object_path(prefix, HLS_PLAYLIST),
            transcript_json,
            transcript_txt,
            duration: transcription.duration,
            language: transcription.language,
        })
    }

    async fn transcribe(&self, wav: &Path) -> Result<Transcription> {
        let transcriber = Arc::clone(&self.transcriber);
        let options = TranscriptionOptions::new().with_language(self.config.whisper_language.clone());
        let wav = wav.to_path_buf();

        tokio::task::spawn_blocking(move || transcriber.transcribe(&wav, &options))
            .await
            .map_err(|e| TranscribeError::internal(format!("Transcription task failed: {}", e)))?
    }
}

/// Basename of an object path, usable as a local file name
fn local_file_name(object_path: &str) -> &str {
    object_path
        .rsplit('/')
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("input")
}
