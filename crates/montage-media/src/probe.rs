//! Media file probing to get metadata without full decode.

use montage_core::{FrameRate, MontageError, RationalTime, Result};
use montage_timeline::SourceRef;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Container extensions the importer accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "mp3", "wav"];

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Duration
    pub duration: RationalTime,
    /// Video streams
    pub video_streams: Vec<VideoStreamInfo>,
    /// Audio streams
    pub audio_streams: Vec<AudioStreamInfo>,
    /// Container format
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl MediaProbe {
    /// Probe a media file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(MontageError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }
        if !is_supported(path) {
            return Err(MontageError::Media(format!(
                "Unsupported media format: {}",
                path_str
            )));
        }

        info!(path = %path_str, "probing media file");

        // Placeholder metadata until a demuxer binding is wired in.
        Ok(Self {
            path: path_str,
            duration: RationalTime::from_seconds_f64(10.0),
            video_streams: vec![VideoStreamInfo {
                index: 0,
                codec: "h264".to_string(),
                width: 1920,
                height: 1080,
                frame_rate: FrameRate::FPS_30,
            }],
            audio_streams: vec![AudioStreamInfo {
                index: 1,
                codec: "aac".to_string(),
                sample_rate: 48000,
                channels: 2,
            }],
            format: "mp4".to_string(),
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Check if the file has audio.
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Get the primary video stream info.
    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }

    /// Get the primary audio stream info.
    pub fn primary_audio(&self) -> Option<&AudioStreamInfo> {
        self.audio_streams.first()
    }

    /// Source reference for placing this media on a timeline.
    pub fn to_source_ref(&self) -> SourceRef {
        SourceRef::new(self.path.clone(), self.duration)
    }
}

/// Whether the path carries a supported container extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn touch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn probe_missing_file_is_not_found() {
        let err = MediaProbe::probe("/nonexistent/clip.mp4").unwrap_err();
        assert!(matches!(err, MontageError::NotFound(_)));
    }

    #[test]
    fn probe_rejects_unsupported_extension() {
        let path = touch("montage_probe_test.txt");
        let err = MediaProbe::probe(&path).unwrap_err();
        assert!(matches!(err, MontageError::Media(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn probe_reports_streams_and_source_ref() {
        let path = touch("montage_probe_test.mp4");
        let probe = MediaProbe::probe(&path).unwrap();
        assert!(probe.has_video());
        assert!(probe.has_audio());
        assert_eq!(probe.primary_video().unwrap().width, 1920);

        let source = probe.to_source_ref();
        assert_eq!(source.duration, probe.duration);
        assert!(source.path.ends_with("montage_probe_test.mp4"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported(Path::new("a/B.MP4")));
        assert!(is_supported(Path::new("b.MkV")));
        assert!(!is_supported(Path::new("c.txt")));
        assert!(!is_supported(Path::new("noext")));
    }
}
