//! Video file acceptance and metadata probing.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::MediaError;
use crate::placement::Size;

/// Extensions accepted as video, with their media type.
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("ogv", "video/ogg"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("3gp", "video/3gpp"),
];

/// A file accepted by the video picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub media_type: &'static str,
}

impl VideoFile {
    /// Accept `path` only if its extension names a video media type.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let path = path.into();
        let media_type = media_type(&path)
            .ok_or_else(|| MediaError::UnsupportedType(path.display().to_string()))?;
        Ok(Self { path, media_type })
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Video media type for a path's extension, if it is one.
#[must_use]
pub fn media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Intrinsic properties of a video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds, 0 when unknown.
    pub duration: f64,
}

impl VideoMetadata {
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Read dimensions and duration with `ffprobe`.
pub async fn probe(path: &Path) -> Result<VideoMetadata, MediaError> {
    let ffprobe = which::which("ffprobe").map_err(|_| MediaError::ProbeUnavailable)?;

    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::Probe(format!(
            "exit status {} for {}",
            output.status,
            path.display()
        )));
    }

    let metadata = parse_probe(&output.stdout)?;
    debug!(
        width = metadata.width,
        height = metadata.height,
        duration = metadata.duration,
        "video probed"
    );
    Ok(metadata)
}

fn parse_probe(stdout: &[u8]) -> Result<VideoMetadata, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::Probe("no video stream found".to_string()))?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    Ok(VideoMetadata {
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_video_extensions_case_insensitively() {
        let file = VideoFile::from_path("/tmp/Vlog.MP4").unwrap();
        assert_eq!(file.media_type, "video/mp4");
        assert_eq!(file.name(), "Vlog.MP4");
        assert_eq!(media_type(Path::new("clip.mov")), Some("video/quicktime"));
    }

    #[test]
    fn rejects_non_video_files() {
        assert!(matches!(
            VideoFile::from_path("notes.txt"),
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(VideoFile::from_path("no_extension").is_err());
        assert!(VideoFile::from_path("song.mp3").is_err());
    }

    #[test]
    fn parses_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "channels": 2},
                {"codec_type": "video", "width": 1080, "height": 1920}
            ],
            "format": {"duration": "12.480000"}
        }"#;
        let meta = parse_probe(json).unwrap();
        assert_eq!((meta.width, meta.height), (1080, 1920));
        assert!((meta.duration - 12.48).abs() < 1e-9);
        assert_eq!(meta.size(), Size::new(1080.0, 1920.0));
    }

    #[test]
    fn probe_without_video_stream_fails() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(parse_probe(json), Err(MediaError::Probe(_))));
    }
}
