use std::sync::Arc;
use tokio::sync::Semaphore;
use transcribe_common::AppConfig;
use transcribe_media::MediaProcessor;
use transcribe_storage::ObjectStorage;
use transcribe_stt::Transcriber;

use crate::job_manager::JobManager;
use crate::pipeline::ProcessingPipeline;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Processing pipeline
    pub pipeline: ProcessingPipeline,

    /// Job manager
    pub job_manager: Arc<JobManager>,

    /// Bounds concurrently running pipelines
    pub job_slots: Semaphore,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        media: Arc<dyn MediaProcessor>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let job_manager = Arc::new(JobManager::new());
        let pipeline = ProcessingPipeline::new(
            storage,
            media,
            transcriber,
            config.clone(),
            Arc::clone(&job_manager),
        );
        let job_slots = Semaphore::new(config.max_concurrent_jobs.max(1));

        Self {
            config,
            pipeline,
            job_manager,
            job_slots,
        }
    }
}
