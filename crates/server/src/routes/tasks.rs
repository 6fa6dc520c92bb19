use actix_web::{get, web, HttpRequest, HttpResponse};
use std::sync::Arc;
use transcribe_common::TranscribeError;

use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::state::AppState;

#[get("/tasks")]
pub async fn get_tasks(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    require_api_key(&req, &state.config.api_key)?;

    let tasks = state.job_manager.get_tasks().await;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/tasks/{task_id}")]
pub async fn get_task(
    req: HttpRequest,
    task_id: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    require_api_key(&req, &state.config.api_key)?;

    let task = state
        .job_manager
        .get_task(&task_id)
        .await
        .ok_or_else(|| TranscribeError::not_found(format!("Task {}", task_id)))?;

    Ok(HttpResponse::Ok().json(task))
}

#[cfg(test)]
mod tests {
    use crate::configure;
    use crate::test_support::{fixture, FakeMedia, FakeStorage, FakeTranscriber, TEST_API_KEY};
    use crate::types::{TaskInfo, TaskStage};
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn test_task_routes() {
        let fx = fixture(FakeStorage::default(), FakeMedia::default(), FakeTranscriber);
        let first = fx
            .state
            .job_manager
            .create_task("a.webm".to_string(), "p/1".to_string())
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = fx
            .state
            .job_manager
            .create_task("b.webm".to_string(), "p/2".to_string())
            .await;
        fx.state.job_manager.advance(&second, TaskStage::Converting).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fx.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/tasks").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/tasks")
            .insert_header(("x-api-key", TEST_API_KEY))
            .to_request();
        let tasks: Vec<TaskInfo> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        let req = test::TestRequest::get()
            .uri(&format!("/tasks/{}", second))
            .insert_header(("x-api-key", TEST_API_KEY))
            .to_request();
        let task: TaskInfo = test::call_and_read_body_json(&app, req).await;
        assert_eq!(task.stage, TaskStage::Converting);
        assert_eq!(task.progress, 25);

        let req = test::TestRequest::get()
            .uri("/tasks/unknown")
            .insert_header(("x-api-key", TEST_API_KEY))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
