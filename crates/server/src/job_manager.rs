use crate::types::{TaskInfo, TaskStage, TaskStatus};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Finished tasks kept for inspection
pub const DEFAULT_RETENTION: usize = 100;

/// In-memory registry of `/process` invocations
pub struct JobManager {
    tasks: RwLock<HashMap<String, TaskInfo>>,
    retention: usize,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JobManager {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub async fn create_task(&self, raw_path: String, processed_prefix: String) -> String {
        let task_id = Uuid::new_v4().to_string();
        let stage = TaskStage::Queued;
        let task_info = TaskInfo {
            task_id: task_id.clone(),
            raw_path,
            processed_prefix,
            status: TaskStatus::Running,
            stage,
            progress: stage.progress(),
            message: stage.message().to_string(),
            started_at: Utc::now(),
            finished_at: None,
        };

        self.tasks.write().await.insert(task_id.clone(), task_info);
        task_id
    }

    /// Move a running task to `stage`; progress never goes backwards
    pub async fn advance(&self, task_id: &str, stage: TaskStage) {
        if let Some(task) = self.tasks.write().await.get_mut(task_id) {
            if task.status != TaskStatus::Running {
                return;
            }
            task.stage = stage;
            task.progress = task.progress.max(stage.progress());
            task.message = stage.message().to_string();
        }
    }

    pub async fn complete_task(&self, task_id: &str) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.status = TaskStatus::Completed;
            task.stage = TaskStage::Completed;
            task.progress = 100;
            task.message = TaskStage::Completed.message().to_string();
            task.finished_at = Some(Utc::now());
        }
        Self::prune(&mut tasks, self.retention);
    }

    pub async fn fail_task(&self, task_id: &str, error: String) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.status = TaskStatus::Failed;
            task.message = error;
            task.finished_at = Some(Utc::now());
        }
        Self::prune(&mut tasks, self.retention);
    }

    pub async fn get_task(&self, task_id: &str) -> Option<TaskInfo> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// All tasks, newest first
    pub async fn get_tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        tasks
    }

    /// Drop the oldest finished tasks beyond `retention`; running tasks are kept
    fn prune(tasks: &mut HashMap<String, TaskInfo>, retention: usize) {
        let mut finished: Vec<(String, chrono::DateTime<Utc>)> = tasks
            .values()
            .filter_map(|t| t.finished_at.map(|at| (t.task_id.clone(), at)))
            .collect();

        if finished.len() <= retention {
            return;
        }

        finished.sort_by(|a, b| a.1.cmp(&b.1));
        let excess = finished.len() - retention;
        for (task_id, _) in finished.into_iter().take(excess) {
            tasks.remove(&task_id);
        }
    }
}
