use std::ffi::OsString;
use std::path::{Path, PathBuf};
use transcribe_common::Result;

/// Playlist file name written by HLS packaging
pub const HLS_PLAYLIST: &str = "master.m3u8";

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Content type for a produced HLS file
pub fn content_type_for(file_name: &str) -> &'static str {
    if file_name.ends_with(".m3u8") {
        PLAYLIST_CONTENT_TYPE
    } else {
        SEGMENT_CONTENT_TYPE
    }
}

/// H.264/AAC VOD rendition, every segment kept in the playlist
pub(crate) fn hls_args(input: &Path, out_dir: &Path, segment_seconds: u32) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.as_os_str().to_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-c:a".into(),
        "aac".into(),
        "-f".into(),
        "hls".into(),
        "-hls_time".into(),
        segment_seconds.to_string().into(),
        "-hls_list_size".into(),
        "0".into(),
        "-y".into(),
        out_dir.join(HLS_PLAYLIST).into_os_string(),
    ]
}

/// Regular files in `dir`, sorted by name
pub(crate) async fn list_outputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}
