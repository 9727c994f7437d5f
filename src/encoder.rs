use crate::{RenderError, Result};
use std::path::{Path, PathBuf};

/// Assembles an ordered, contiguous frame sequence into one video file.
/// The input pattern is printf-style (`<id>-%04d.jpg`); implementations wait
/// synchronously and surface the encoder's diagnostic text on failure.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, pattern: &Path, fps: u32, output: &Path) -> Result<()>;
}

pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn discover() -> Result<Self> {
        which::which("ffmpeg")
            .map(Self::new)
            .map_err(|_| RenderError::EncoderFailed("ffmpeg not found in PATH".into()))
    }

    fn build_args(pattern: &Path, fps: u32, output: &Path) -> Vec<String> {
        vec![
            "-r".into(),
            fps.to_string(),
            "-i".into(),
            pattern.display().to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-crf".into(),
            "20".into(),
            "-preset".into(),
            "fast".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-an".into(),
            "-y".into(),
            output.display().to_string(),
        ]
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn encode(&self, pattern: &Path, fps: u32, output: &Path) -> Result<()> {
        let args = Self::build_args(pattern, fps, output);

        let result = std::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| {
                RenderError::EncoderFailed(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let diagnostic = String::from_utf8_lossy(&result.stderr);
            return Err(RenderError::EncoderFailed(diagnostic.trim().to_string()));
        }

        Ok(())
    }
}
