//! Audio transcription via external binaries.
//!
//! The frontend records webm/opus; ffmpeg resamples it to the 16 kHz
//! mono 16-bit PCM wav whisper.cpp expects, and `whisper-cli` prints the
//! transcription on stdout. Both binaries and the model are configurable;
//! the defaults match a whisper.cpp checkout in the working directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors from the transcription pipeline.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Staging the audio or spawning a binary failed.
    #[error("failed to run transcription pipeline: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio conversion failed: {detail}")]
    Conversion { detail: String },

    #[error("whisper transcription failed: {detail}")]
    Transcription { detail: String },
}

/// Where the transcription binaries and the model live.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub ffmpeg_path: PathBuf,
    pub whisper_path: PathBuf,
    pub model_path: PathBuf,
}

impl SpeechConfig {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            whisper_path: PathBuf::from("./whisper.cpp/build/bin/whisper-cli"),
            model_path: PathBuf::from("./whisper.cpp/models/ggml-base.bin"),
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_whisper_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.whisper_path = path.into();
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Transcribes recorded audio through ffmpeg and whisper.cpp.
#[derive(Debug, Clone)]
pub struct Transcriber {
    config: SpeechConfig,
}

impl Transcriber {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Writes the audio to a temp file, converts it to wav and runs
    /// whisper over it. Temp files are removed on every path; a cleanup
    /// failure is logged, never fatal.
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let webm = tempfile::Builder::new()
            .prefix("alexo-audio-")
            .suffix(".webm")
            .tempfile()?;
        std::fs::write(webm.path(), audio)?;
        let wav_path = webm.path().with_extension("wav");

        let result = self.run_pipeline(webm.path(), &wav_path).await;

        // The webm side is removed when `webm` drops.
        if let Err(err) = std::fs::remove_file(&wav_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %wav_path.display(), error = %err, "failed to clean up converted audio");
            }
        }

        result
    }

    async fn run_pipeline(&self, webm: &Path, wav: &Path) -> Result<String, SpeechError> {
        let ffmpeg = Command::new(&self.config.ffmpeg_path)
            .arg("-i")
            .arg(webm)
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
            .arg(wav)
            .output()
            .await?;
        if !ffmpeg.status.success() {
            return Err(SpeechError::Conversion {
                detail: String::from_utf8_lossy(&ffmpeg.stderr).trim().to_string(),
            });
        }

        let whisper = Command::new(&self.config.whisper_path)
            .arg("-m")
            .arg(&self.config.model_path)
            .arg("-f")
            .arg(wav)
            .args(["--no-prints", "--no-timestamps"])
            .output()
            .await?;
        if !whisper.status.success() {
            return Err(SpeechError::Transcription {
                detail: String::from_utf8_lossy(&whisper.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&whisper.stdout).trim().to_string();
        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_point_at_a_local_whisper_checkout() {
        let config = SpeechConfig::new();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.whisper_path.to_string_lossy().contains("whisper-cli"));
        assert!(config.model_path.to_string_lossy().contains("ggml-base.bin"));
    }

    #[test]
    fn builders_override_paths() {
        let config = SpeechConfig::new()
            .with_ffmpeg_path("/opt/ffmpeg")
            .with_whisper_path("/opt/whisper-cli")
            .with_model_path("/opt/model.bin");
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.whisper_path, PathBuf::from("/opt/whisper-cli"));
        assert_eq!(config.model_path, PathBuf::from("/opt/model.bin"));
    }

    #[tokio::test]
    async fn missing_converter_binary_is_an_io_error() {
        let config = SpeechConfig::new()
            .with_ffmpeg_path("/nonexistent/alexo-test-ffmpeg")
            .with_whisper_path("/nonexistent/alexo-test-whisper");
        let transcriber = Transcriber::new(config);

        let err = transcriber.transcribe(b"not really audio").await.unwrap_err();
        assert!(matches!(err, SpeechError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_converter_reports_its_stderr() {
        // `false` exits non-zero without reading its arguments, standing
        // in for an ffmpeg that rejects the input.
        let config = SpeechConfig::new().with_ffmpeg_path("false");
        let transcriber = Transcriber::new(config);

        let err = transcriber.transcribe(b"junk").await.unwrap_err();
        assert!(matches!(err, SpeechError::Conversion { .. }));
    }
}
