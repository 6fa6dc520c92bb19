use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `POST /process` body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Object path in the raw bucket, optionally prefixed with the bucket name
    #[serde(default)]
    pub raw_path: Option<String>,

    /// Destination prefix for the HLS rendition and transcripts
    #[serde(default)]
    pub processed_prefix: Option<String>,
}

/// Validated processing job
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessJob {
    pub raw_path: String,
    pub processed_prefix: String,
}

impl ProcessRequest {
    /// Both fields present and non-empty; trailing `/` on the prefix dropped
    pub fn into_job(self) -> Option<ProcessJob> {
        let raw_path = self.raw_path.filter(|p| !p.trim().is_empty())?;
        let processed_prefix = self
            .processed_prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.trim().is_empty())?;

        Some(ProcessJob {
            raw_path,
            processed_prefix,
        })
    }
}

/// `POST /process` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// HLS playlist path in the processed bucket
    pub processed_path: String,

    /// Transcript JSON path in the transcripts bucket
    pub transcript_json: String,

    /// Transcript text path in the transcripts bucket
    pub transcript_txt: String,

    /// Audio length in seconds
    pub duration: f32,

    /// Detected or configured language
    pub language: String,
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// Pipeline stage a task has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStage {
    Queued,
    Downloading,
    Converting,
    Transcribing,
    Packaging,
    Uploading,
    Completed,
}

impl TaskStage {
    /// Progress percentage reported when the stage starts
    pub fn progress(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Downloading => 10,
            Self::Converting => 25,
            Self::Transcribing => 40,
            Self::Packaging => 70,
            Self::Uploading => 85,
            Self::Completed => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Queued => "Waiting for a free worker...",
            Self::Downloading => "Downloading source media...",
            Self::Converting => "Converting audio...",
            Self::Transcribing => "Transcribing...",
            Self::Packaging => "Packaging HLS...",
            Self::Uploading => "Uploading results...",
            Self::Completed => "Completed",
        }
    }
}

/// Task information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub raw_path: String,
    pub processed_prefix: String,
    pub status: TaskStatus,
    pub stage: TaskStage,
    pub progress: u8,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
