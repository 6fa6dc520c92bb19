use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use transcribe_common::{logger, AppConfig, ModelManager};
use transcribe_media::Ffmpeg;
use transcribe_server::AppState;
use transcribe_storage::SupabaseStorage;
use transcribe_stt::WhisperEngine;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env from the project root, falling back to the working directory
fn load_dotenv() {
    if let Some(env_path) = find_project_root()
        .map(|root| root.join(".env"))
        .filter(|path| path.exists())
    {
        dotenv::from_path(&env_path).ok();
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "transcribe")]
#[command(about = "Media transcription service: HLS packaging and Whisper transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides SERVER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides SERVER_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate configuration and ffmpeg availability, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            serve(config).await
        }
        Some(Commands::Check) => check(config).await,
        None => serve(config).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(config.log_dir.as_deref(), &config.log_level)?;

    tracing::info!("Transcribe service starting...");
    let ffmpeg = preflight(&config).await?;

    tracing::info!("Configuration loaded:");
    tracing::info!("  Bind: {}", config.server_bind_address());
    tracing::info!("  Storage: {}", config.supabase_url);
    tracing::info!(
        "  Buckets: raw={} processed={} transcripts={}",
        config.raw_bucket,
        config.processed_bucket,
        config.transcripts_bucket
    );
    tracing::info!("  Whisper model: {}", config.whisper_model);
    tracing::info!("  Max concurrent jobs: {}", config.max_concurrent_jobs);

    let models = ModelManager::new(config.models_dir.clone())?;
    let model_path = models.ensure_whisper_model(&config.whisper_model).await?;
    let engine = tokio::task::spawn_blocking(move || WhisperEngine::new(model_path)).await??;
    tracing::info!(
        "  Whisper: {} on {:?}",
        engine.model_path(),
        engine.gpu_device()
    );

    let storage = SupabaseStorage::new(&config.supabase_url, config.supabase_key.clone())?;

    let bind_addr = config.server_bind_address();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(storage),
        Arc::new(ffmpeg),
        Arc::new(engine),
    ));

    println!("Server listening on http://{}", bind_addr);
    transcribe_server::start_server(state).await?;

    Ok(())
}

/// Checks that must pass before anything is loaded or bound
async fn preflight(config: &AppConfig) -> Result<Ffmpeg> {
    config.validate()?;

    let ffmpeg = Ffmpeg::new(config.ffmpeg_path.clone());
    let banner = ffmpeg.probe().await?;
    tracing::info!("  FFmpeg: {}", banner);

    Ok(ffmpeg)
}

async fn check(config: AppConfig) -> Result<()> {
    logger::setup_console_logging(&config.log_level)?;

    preflight(&config).await?;
    println!("Configuration and FFmpeg OK ({})", config.server_bind_address());

    let models = ModelManager::new(config.models_dir.clone())?;
    match models.local_model_path(&config.whisper_model) {
        Some(path) => println!("Whisper model '{}' found: {}", config.whisper_model, path.display()),
        None => println!(
            "Whisper model '{}' not cached, it will be downloaded to {} on first start",
            config.whisper_model,
            config.models_dir.display()
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            supabase_url: "https://project.supabase.co".to_string(),
            supabase_key: "service-role".to_string(),
            models_dir: dir.join("models"),
            work_dir: dir.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_preflight_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            supabase_url: String::new(),
            ..valid_config(dir.path())
        };

        let err = preflight(&config).await.unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"), "{}", err);
    }

    #[tokio::test]
    async fn test_preflight_rejects_missing_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            ffmpeg_path: dir.path().join("no-such-ffmpeg").to_string_lossy().into_owned(),
            ..valid_config(dir.path())
        };

        let err = preflight(&config).await.unwrap_err();
        assert!(err.to_string().contains("FFmpeg"), "{}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_preflight_accepts_working_ffmpeg() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(&script, "#!/bin/sh\necho 'ffmpeg version 6.1 Copyright (c)'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = AppConfig {
            ffmpeg_path: script.to_string_lossy().into_owned(),
            ..valid_config(dir.path())
        };

        assert!(preflight(&config).await.is_ok());
    }
}
