use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};
use transcribe_common::{Result, TranscribeError};

use crate::hls;
use crate::MediaProcessor;

/// Lines of ffmpeg stderr kept in error messages
const STDERR_TAIL_LINES: usize = 12;

/// ffmpeg command line wrapper
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    /// Use the given ffmpeg executable (name on PATH or absolute path)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check ffmpeg is invocable, returning its version banner
    pub async fn probe(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                TranscribeError::media(format!(
                    "Failed to run {}: {}. Make sure FFmpeg is installed.",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            return Err(TranscribeError::media(format!(
                "{} -version exited with {}",
                self.program, output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(banner)
    }

    /// Run ffmpeg with the given arguments, failing on non-zero exit
    async fn run(&self, args: Vec<OsString>) -> Result<()> {
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .arg("-hide_banner")
            .arg("-nostdin")
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TranscribeError::media(format!(
                    "Failed to run FFmpeg: {}. Make sure FFmpeg is installed.",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::media(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr_tail(&stderr, STDERR_TAIL_LINES)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaProcessor for Ffmpeg {
    async fn convert_to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Converting {} to WAV using FFmpeg", input.display());

        self.run(wav_args(input, output)).await?;

        info!("FFmpeg conversion successful: {}", output.display());
        Ok(())
    }

    async fn package_hls(
        &self,
        input: &Path,
        out_dir: &Path,
        segment_seconds: u32,
    ) -> Result<Vec<PathBuf>> {
        info!(
            "Packaging {} as HLS ({}s segments) into {}",
            input.display(),
            segment_seconds,
            out_dir.display()
        );

        tokio::fs::create_dir_all(out_dir).await?;
        self.run(hls::hls_args(input, out_dir, segment_seconds)).await?;

        let files = hls::list_outputs(out_dir).await?;
        if !files.iter().any(|f| f.ends_with(hls::HLS_PLAYLIST)) {
            return Err(TranscribeError::media("FFmpeg did not produce an HLS playlist"));
        }

        info!("HLS packaging produced {} files", files.len());
        Ok(files)
    }
}

/// Arguments converting any input to 16 kHz mono PCM16 WAV
pub(crate) fn wav_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.as_os_str().to_owned(),
        "-ar".into(),
        "16000".into(), // 16kHz sample rate
        "-ac".into(),
        "1".into(), // Mono
        "-c:a".into(),
        "pcm_s16le".into(), // 16-bit PCM
        "-f".into(),
        "wav".into(),
        "-y".into(), // Overwrite output
        output.as_os_str().to_owned(),
    ]
}

/// Last `max_lines` non-empty lines of ffmpeg's stderr
pub(crate) fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
