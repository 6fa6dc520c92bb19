//! Model Manager for automatic model downloading
//!
//! Resolves the configured Whisper model to a local ggml file, downloading it
//! from the whisper.cpp model repository when missing.

use crate::{Result, TranscribeError};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Whisper model information
#[derive(Debug, Clone)]
pub struct WhisperModel {
    /// Model name (e.g., "base", "small", "medium")
    pub name: String,

    /// Approximate file size in bytes
    pub size: u64,

    /// Download URL
    pub url: String,
}

impl WhisperModel {
    fn known(name: &str, size_mb: u64) -> Self {
        Self {
            name: name.to_string(),
            size: size_mb * 1024 * 1024,
            url: format!("{}/ggml-{}.bin", MODEL_BASE_URL, name),
        }
    }

    /// Get model filename
    pub fn filename(&self) -> String {
        model_filename(&self.name)
    }

    /// Get size in MB
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / 1024.0 / 1024.0
    }
}

/// ggml file name for a model name
pub fn model_filename(name: &str) -> String {
    format!("ggml-{}.bin", name)
}

/// Available Whisper models
pub fn available_whisper_models() -> Vec<WhisperModel> {
    vec![
        WhisperModel::known("tiny", 75),
        WhisperModel::known("tiny.en", 75),
        WhisperModel::known("base", 142),
        WhisperModel::known("base.en", 142),
        WhisperModel::known("small", 466),
        WhisperModel::known("small.en", 466),
        WhisperModel::known("medium", 1500),
        WhisperModel::known("medium.en", 1500),
        WhisperModel::known("large-v3", 3100),
        WhisperModel::known("large-v3-turbo", 1600),
    ]
}

/// Model Manager
pub struct ModelManager {
    models_dir: PathBuf,
    client: Client,
}

impl ModelManager {
    /// Create new model manager
    pub fn new(models_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3600)) // 1 hour for large downloads
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { models_dir, client })
    }

    /// Get default models directory
    pub fn default_models_dir() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(".cache/transcribe/models");
            }
        }

        #[cfg(target_os = "macos")]
        {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join("Library/Caches/transcribe/models");
            }
        }

        #[cfg(target_os = "windows")]
        {
            if let Some(local_app_data) = std::env::var_os("LOCALAPPDATA") {
                return PathBuf::from(local_app_data).join("transcribe\\models");
            }
        }

        // Fallback
        PathBuf::from("models")
    }

    /// Local path for a model without touching the network
    ///
    /// `model` may be a path to an existing file or a model name.
    pub fn local_model_path(&self, model: &str) -> Option<PathBuf> {
        let as_path = Path::new(model);
        if as_path.is_file() {
            return Some(as_path.to_path_buf());
        }

        let in_dir = self.models_dir.join(model_filename(model));
        in_dir.is_file().then_some(in_dir)
    }

    /// Ensure Whisper model exists, download if missing
    pub async fn ensure_whisper_model(&self, model: &str) -> Result<PathBuf> {
        if let Some(path) = self.local_model_path(model) {
            info!("Model already exists: {}", path.display());
            return Ok(path);
        }

        info!("Model not found, downloading: {}", model);

        let models = available_whisper_models();
        let model_info = models
            .iter()
            .find(|m| m.name == model)
            .ok_or_else(|| TranscribeError::config(format!("Unknown Whisper model: {}", model)))?;

        let model_path = self.models_dir.join(model_info.filename());
        self.download_model(model_info, &model_path).await?;

        Ok(model_path)
    }

    /// Download model from URL
    pub async fn download_model(&self, model: &WhisperModel, dest: &Path) -> Result<()> {
        info!(
            "Downloading {} ({:.1} MB) from {}",
            model.filename(),
            model.size_mb(),
            model.url
        );

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let pb = ProgressBar::new(model.size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let response = self
            .client
            .get(&model.url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to download: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Download failed with status: {}", response.status()).into());
        }

        // Write to temporary file first
        let temp_path = dest.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| anyhow::anyhow!("Download error: {}", e))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        pb.finish_with_message("Download complete");
        file.sync_all().await?;
        drop(file);

        let metadata = fs::metadata(&temp_path).await?;
        if metadata.len() < model.size / 2 {
            fs::remove_file(&temp_path).await?;
            return Err(anyhow::anyhow!(
                "Downloaded file is too small ({} bytes, expected ~{} bytes)",
                metadata.len(),
                model.size
            )
            .into());
        }

        fs::rename(&temp_path, dest).await?;

        info!("Download successful: {}", dest.display());

        Ok(())
    }
}
