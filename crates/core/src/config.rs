use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::types::ModelProfile;

/// Audio quality requested from the acquisition backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQuality {
    #[default]
    Fast,
    Medium,
    Slow,
}

impl AudioQuality {
    /// Bitrate in kbps handed to yt-dlp's audio postprocessor.
    pub fn bitrate(self) -> &'static str {
        match self {
            AudioQuality::Fast => "32",
            AudioQuality::Medium => "64",
            AudioQuality::Slow => "128",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub language: Option<String>,
    pub threads: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("models").join("ggml-base.bin"),
            language: None,
            threads: None,
        }
    }
}

/// Process-wide configuration, constructed once at startup and passed by
/// reference into the orchestrator and item pipelines. No ambient lookup
/// happens inside stage logic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where per-job artifacts and the batch report are written.
    pub output_dir: PathBuf,
    /// Scratch space for transient audio assets.
    pub work_dir: PathBuf,
    /// Cross-job parallelism bound.
    pub concurrency: usize,
    /// Keep transient audio instead of removing it during cleanup.
    pub keep_audio: bool,
    pub audio_quality: AudioQuality,
    /// Per backend call timeout, seconds.
    pub request_timeout_secs: u64,
    /// Total attempts per backend call (1 = no retry).
    pub retry_attempts: u32,
    /// First backoff delay; doubles per attempt.
    pub retry_base_delay_ms: u64,
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            work_dir: std::env::temp_dir().join("mediascribe"),
            concurrency: 2,
            keep_audio: false,
            audio_quality: AudioQuality::default(),
            request_timeout_secs: 180,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            model: ModelConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing path yields the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&text)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model_profile(&self) -> ModelProfile {
        ModelProfile {
            model_path: self.model.path.clone(),
            language: self.model.language.clone(),
            threads: self.model.threads,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediascribe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.concurrency >= 1);
        assert!(config.retry_attempts >= 1);
        assert_eq!(config.audio_quality.bitrate(), "32");
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            concurrency = 8
            audio_quality = "slow"

            [model]
            language = "zh"
            "#,
        )
        .unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.audio_quality, AudioQuality::Slow);
        assert_eq!(config.model.language.as_deref(), Some("zh"));
        assert!(!config.keep_audio);
    }
}
