//! Transcription HTTP server
//!
//! Actix-web 기반 REST API: health check, media processing pipeline and
//! task progress endpoints.

pub mod auth;
pub mod error;
pub mod job_manager;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::ApiError;
pub use job_manager::JobManager;
pub use pipeline::ProcessingPipeline;
pub use state::AppState;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use transcribe_common::{Result, TranscribeError};

/// Register every route on an actix `ServiceConfig`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health::health)
        .service(routes::process::process)
        .service(routes::tasks::get_tasks)
        .service(routes::tasks::get_task);
}

/// Bind and run the HTTP server until shutdown
pub async fn start_server(state: Arc<AppState>) -> Result<()> {
    let bind_addr = state.config.server_bind_address();
    let data = web::Data::new(state);

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind(&bind_addr)
    .map_err(|e| TranscribeError::config(format!("Failed to bind {}: {}", bind_addr, e)))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
