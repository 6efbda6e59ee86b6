use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use crate::backends::AudioSource;
use crate::config::AudioQuality;
use crate::error::{Result, ScribeError};
use crate::types::{AudioAsset, SourceDescriptor};

/// Acquisition via external tools: yt-dlp for remote URLs, ffmpeg for local
/// media files. Both paths land on a 16 kHz mono WAV ready for Whisper.
pub struct YtDlpSource {
    quality: AudioQuality,
}

impl YtDlpSource {
    pub fn new(quality: AudioQuality) -> Self {
        Self { quality }
    }

    async fn download_audio(&self, url: &str, workdir: &Path, job_id: &str) -> Result<PathBuf> {
        let output_template = workdir.join("%(id)s.%(ext)s");
        let output = Command::new("yt-dlp")
            .arg(url)
            .arg("--no-playlist")
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg(format!("{}K", self.quality.bitrate()))
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--no-simulate")
            .arg("-o")
            .arg(&output_template)
            .output()
            .await
            .map_err(|e| ScribeError::Acquisition {
                source: url.to_string(),
                reason: format!("failed to run yt-dlp: {e}"),
            })?;

        if !output.status.success() {
            return Err(ScribeError::Acquisition {
                source: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let downloaded = stdout.lines().last().map(str::trim).unwrap_or_default();
        if downloaded.is_empty() {
            return Err(ScribeError::Acquisition {
                source: url.to_string(),
                reason: "yt-dlp did not report an output file".to_string(),
            });
        }
        tracing::debug!(url, file = downloaded, "download finished");

        let wav = workdir.join(format!("{job_id}.wav"));
        let downloaded = PathBuf::from(downloaded);
        let result = extract_wav(&downloaded, &wav).await;
        // The intermediate download is no longer needed either way.
        let _ = fs::remove_file(&downloaded).await;
        result?;
        Ok(wav)
    }
}

/// Decode any ffmpeg-readable input to 16 kHz mono PCM WAV.
async fn extract_wav(input: &Path, wav: &Path) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg(wav)
        .output()
        .await
        .map_err(|e| ScribeError::Acquisition {
            source: input.display().to_string(),
            reason: format!("failed to run ffmpeg: {e}"),
        })?;

    if !output.status.success() {
        return Err(ScribeError::Acquisition {
            source: input.display().to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn acquire(&self, descriptor: &SourceDescriptor, workdir: &Path) -> Result<AudioAsset> {
        fs::create_dir_all(workdir).await?;
        let job_id = descriptor.job_id();

        let path = match descriptor {
            SourceDescriptor::RemoteUrl { url } => {
                self.download_audio(url, workdir, &job_id).await?
            }
            SourceDescriptor::LocalPath { path } => {
                if !fs::try_exists(path).await.unwrap_or(false) {
                    return Err(ScribeError::Acquisition {
                        source: path.display().to_string(),
                        reason: "file not found".to_string(),
                    });
                }
                let wav = workdir.join(format!("{job_id}.wav"));
                extract_wav(path, &wav).await?;
                wav
            }
            SourceDescriptor::SearchQuery { query, .. } => {
                return Err(ScribeError::Acquisition {
                    source: format!("search:{query}"),
                    reason: "search descriptors must be expanded before acquisition".to_string(),
                });
            }
        };

        Ok(AudioAsset {
            path,
            title: None,
            duration_seconds: None,
        })
    }
}
