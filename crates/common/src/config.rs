use crate::error::TranscribeError;
use crate::model_manager::ModelManager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transcription service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Supabase project URL
    pub supabase_url: String,

    /// Supabase service role key
    #[serde(skip_serializing)]
    pub supabase_key: String,

    /// Bucket holding uploaded source media
    pub raw_bucket: String,

    /// Bucket receiving the HLS rendition
    pub processed_bucket: String,

    /// Bucket receiving transcript JSON/TXT
    pub transcripts_bucket: String,

    /// Whisper model name or path
    pub whisper_model: String,

    /// Language hint, `None` means auto-detect
    pub whisper_language: Option<String>,

    /// Shared secret expected in `x-api-key`
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Directory holding ggml model files
    pub models_dir: PathBuf,

    /// Parent directory for per-request scratch directories
    pub work_dir: PathBuf,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Target HLS segment length in seconds
    pub hls_segment_seconds: u32,

    /// Upper bound on pipelines running at once
    pub max_concurrent_jobs: usize,

    /// Log level
    pub log_level: String,

    /// Log directory, console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            raw_bucket: "raw".to_string(),
            processed_bucket: "processed".to_string(),
            transcripts_bucket: "transcripts".to_string(),
            whisper_model: "base".to_string(),
            whisper_language: None,
            api_key: "changeme".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            models_dir: ModelManager::default_models_dir(),
            work_dir: std::env::temp_dir(),
            ffmpeg_path: "ffmpeg".to_string(),
            hls_segment_seconds: 4,
            max_concurrent_jobs: 1,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, TranscribeError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let config = Self::from_lookup(|key| std::env::var(key).ok());

        config.ensure_directories()?;

        Ok(config)
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// Unset variables fall back to [`AppConfig::default`]; numeric values that
    /// fail to parse fall back as well.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            supabase_url: get("SUPABASE_URL", defaults.supabase_url)
                .trim_end_matches('/')
                .to_string(),
            supabase_key: get("SUPABASE_KEY", defaults.supabase_key),
            raw_bucket: get("RAW_BUCKET", defaults.raw_bucket),
            processed_bucket: get("PROCESSED_BUCKET", defaults.processed_bucket),
            transcripts_bucket: get("TRANSCRIPTS_BUCKET", defaults.transcripts_bucket),
            whisper_model: get("WHISPER_MODEL", defaults.whisper_model),
            whisper_language: lookup("WHISPER_LANGUAGE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "auto"),
            api_key: get("TRANSCRIBE_API_KEY", defaults.api_key),
            server_host: get("SERVER_HOST", defaults.server_host),
            server_port: parse_var(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
            models_dir: lookup("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            work_dir: lookup("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_path: get("FFMPEG_PATH", defaults.ffmpeg_path),
            hls_segment_seconds: parse_var(&lookup, "HLS_SEGMENT_SECONDS")
                .unwrap_or(defaults.hls_segment_seconds),
            max_concurrent_jobs: parse_var(&lookup, "MAX_CONCURRENT_JOBS")
                .unwrap_or(defaults.max_concurrent_jobs),
            log_level: get("LOG_LEVEL", defaults.log_level),
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
        }
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), TranscribeError> {
        let mut dirs = vec![&self.models_dir, &self.work_dir];
        if let Some(log_dir) = &self.log_dir {
            dirs.push(log_dir);
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    TranscribeError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TranscribeError> {
        if self.supabase_url.is_empty() {
            return Err(TranscribeError::config("SUPABASE_URL is not set"));
        }

        if !self.supabase_url.starts_with("http://") && !self.supabase_url.starts_with("https://") {
            return Err(TranscribeError::config(
                "SUPABASE_URL must start with http:// or https://",
            ));
        }

        if self.supabase_key.is_empty() {
            return Err(TranscribeError::config("SUPABASE_KEY is not set"));
        }

        for (name, bucket) in [
            ("RAW_BUCKET", &self.raw_bucket),
            ("PROCESSED_BUCKET", &self.processed_bucket),
            ("TRANSCRIPTS_BUCKET", &self.transcripts_bucket),
        ] {
            if bucket.trim().is_empty() {
                return Err(TranscribeError::config(format!("{} cannot be empty", name)));
            }
        }

        if self.whisper_model.is_empty() {
            return Err(TranscribeError::config("Whisper model name cannot be empty"));
        }

        if self.server_port == 0 {
            return Err(TranscribeError::config("Server port cannot be 0"));
        }

        if self.hls_segment_seconds == 0 {
            return Err(TranscribeError::config("HLS segment length cannot be 0"));
        }

        if self.max_concurrent_jobs == 0 {
            return Err(TranscribeError::config("MAX_CONCURRENT_JOBS must be at least 1"));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> AppConfig {
        AppConfig {
            supabase_url: "https://project.supabase.co".to_string(),
            supabase_key: "service-role".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.supabase_url, "");
        assert_eq!(config.supabase_key, "");
        assert_eq!(config.raw_bucket, "raw");
        assert_eq!(config.processed_bucket, "processed");
        assert_eq!(config.transcripts_bucket, "transcripts");
        assert_eq!(config.whisper_model, "base");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_bind_address(), "0.0.0.0:8080");
        assert!(config.whisper_language.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_KEY", "secret"),
            ("RAW_BUCKET", "uploads"),
            ("PROCESSED_BUCKET", "hls"),
            ("TRANSCRIPTS_BUCKET", "text"),
            ("WHISPER_MODEL", "medium"),
            ("WHISPER_LANGUAGE", "en"),
            ("SERVER_PORT", "9000"),
            ("HLS_SEGMENT_SECONDS", "6"),
        ]));

        assert_eq!(config.supabase_url, "https://abc.supabase.co");
        assert_eq!(config.supabase_key, "secret");
        assert_eq!(config.raw_bucket, "uploads");
        assert_eq!(config.processed_bucket, "hls");
        assert_eq!(config.transcripts_bucket, "text");
        assert_eq!(config.whisper_model, "medium");
        assert_eq!(config.whisper_language.as_deref(), Some("en"));
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.hls_segment_seconds, 6);
    }

    #[test]
    fn test_unparsable_port_falls_back() {
        let config = AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "http")]));
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn test_auto_language_means_detect() {
        let config = AppConfig::from_lookup(lookup_from(&[("WHISPER_LANGUAGE", "auto")]));
        assert!(config.whisper_language.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        // Defaults carry no credentials
        assert!(AppConfig::default().validate().is_err());

        let mut config = valid_config();
        config.supabase_url = "project.supabase.co".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.supabase_key = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.raw_bucket = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.whisper_model = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_directories() {
        let root = tempfile::tempdir().unwrap();
        let config = AppConfig {
            models_dir: root.path().join("models"),
            work_dir: root.path().join("work"),
            log_dir: Some(root.path().join("log")),
            ..valid_config()
        };

        config.ensure_directories().unwrap();
        assert!(root.path().join("models").is_dir());
        assert!(root.path().join("work").is_dir());
        assert!(root.path().join("log").is_dir());
    }
}
