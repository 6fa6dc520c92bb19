//! In-memory stand-ins for storage, ffmpeg and Whisper

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use transcribe_common::{AppConfig, Result, TranscribeError};
use transcribe_media::MediaProcessor;
use transcribe_storage::ObjectStorage;
use transcribe_stt::{Segment, Transcriber, Transcription, TranscriptionOptions, Word};

use crate::state::AppState;

pub const TEST_API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct Upload {
    pub bucket: String,
    pub path: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct FakeStorage {
    pub fail_download: bool,
    downloads: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<Upload>>,
}

impl FakeStorage {
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn uploaded(&self, bucket: &str, path: &str) -> Option<Upload> {
        self.uploads()
            .into_iter()
            .find(|u| u.bucket == bucket && u.path == path)
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn download(&self, bucket: &str, path: &str, dest: &Path) -> Result<u64> {
        self.downloads
            .lock()
            .unwrap()
            .push((bucket.to_string(), path.to_string()));

        if self.fail_download {
            return Err(TranscribeError::storage(format!(
                "Download of {}/{} failed (404 Not Found)",
                bucket, path
            )));
        }

        tokio::fs::write(dest, b"media").await?;
        Ok(5)
    }

    async fn upload(&self, bucket: &str, path: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.uploads.lock().unwrap().push(Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMedia {
    pub fail_hls: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn convert_to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        assert!(input.exists(), "input was not downloaded");
        if input == output {
            return Err(TranscribeError::media(format!(
                "Output {} same as Input #0 - exiting",
                output.display()
            )));
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} -> {}", name(input), name(output)));
        tokio::fs::write(output, b"RIFF").await?;
        Ok(())
    }

    async fn package_hls(&self, input: &Path, out_dir: &Path, segment_seconds: u32) -> Result<Vec<PathBuf>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} -> hls/{}s", name(input), segment_seconds));

        if self.fail_hls {
            return Err(TranscribeError::media("FFmpeg exited with exit status: 1"));
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let playlist = out_dir.join("master.m3u8");
        let segment = out_dir.join("master0.ts");
        tokio::fs::write(&playlist, b"#EXTM3U\n").await?;
        tokio::fs::write(&segment, [0x47u8; 188]).await?;
        Ok(vec![playlist, segment])
    }
}

#[derive(Default)]
pub struct FakeTranscriber;

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, audio_path: &Path, options: &TranscriptionOptions) -> Result<Transcription> {
        if !audio_path.exists() {
            return Err(TranscribeError::stt("audio file missing"));
        }

        let first = Segment::new(0, 0.0, 1.5, " Hello there.").with_words(vec![
            Word {
                word: "Hello".to_string(),
                start: 0.0,
                end: 0.6,
            },
            Word {
                word: "there.".to_string(),
                start: 0.6,
                end: 1.5,
            },
        ]);
        let second = Segment::new(1, 1.5, 3.5, " General Kenobi. ");
        let language = options.language.clone().unwrap_or_else(|| "en".to_string());

        Ok(Transcription::new(3.5, language, vec![first, second]))
    }
}

pub struct Fixture {
    pub state: Arc<AppState>,
    pub storage: Arc<FakeStorage>,
    pub media: Arc<FakeMedia>,
    pub work_dir: TempDir,
}

pub fn fixture(storage: FakeStorage, media: FakeMedia, transcriber: FakeTranscriber) -> Fixture {
    let work_dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        supabase_url: "http://storage.test".to_string(),
        supabase_key: "service-key".to_string(),
        api_key: TEST_API_KEY.to_string(),
        work_dir: work_dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let storage = Arc::new(storage);
    let media = Arc::new(media);
    let state = Arc::new(AppState::new(
        config,
        storage.clone(),
        media.clone(),
        Arc::new(transcriber),
    ));

    Fixture {
        state,
        storage,
        media,
        work_dir,
    }
}
