use actix_web::{post, web, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::{error, info};
use transcribe_common::{Result, TranscribeError};

use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{ProcessJob, ProcessRequest, ProcessResponse};

#[post("/process")]
pub async fn process(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<Arc<AppState>>,
) -> std::result::Result<HttpResponse, ApiError> {
    // Key is checked before the body is looked at
    require_api_key(&req, &state.config.api_key)?;

    let request: ProcessRequest = serde_json::from_slice(&body)
        .map_err(|e| TranscribeError::invalid_input(format!("Invalid JSON body: {}", e)))?;
    let job = request
        .into_job()
        .ok_or_else(|| TranscribeError::invalid_input("Missing rawPath or processedPrefix"))?;

    let task_id = state
        .job_manager
        .create_task(job.raw_path.clone(), job.processed_prefix.clone())
        .await;
    info!("Task {} queued: {} -> {}", task_id, job.raw_path, job.processed_prefix);

    // Runs to completion even if the client disconnects
    let state = Arc::clone(state.get_ref());
    let response = tokio::spawn(run_task(state, task_id, job))
        .await
        .map_err(|e| TranscribeError::internal(format!("Processing task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(response))
}

async fn run_task(state: Arc<AppState>, task_id: String, job: ProcessJob) -> Result<ProcessResponse> {
    let _permit = state
        .job_slots
        .acquire()
        .await
        .map_err(|_| TranscribeError::internal("Job queue is closed"))?;

    match state.pipeline.execute(&task_id, &job).await {
        Ok(response) => {
            state.job_manager.complete_task(&task_id).await;
            info!(
                "Task {} completed: {} ({:.1}s, {})",
                task_id, response.processed_path, response.duration, response.language
            );
            Ok(response)
        }
        Err(e) => {
            error!("Task {} failed: {}", task_id, e);
            state.job_manager.fail_task(&task_id, e.to_string()).await;
            Err(e)
        }
    }
}
