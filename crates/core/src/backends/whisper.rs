use std::path::Path;

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::backends::SpeechToText;
use crate::error::{Result, ScribeError};
use crate::types::{AudioAsset, ModelProfile, Segment, Transcript};

/// Local Whisper transcription via whisper-rs. The model inference is
/// synchronous FFI, so it runs on the blocking pool.
#[derive(Default)]
pub struct WhisperTranscriber;

impl WhisperTranscriber {
    pub fn new() -> Self {
        Self
    }
}

fn transcribe_error(audio_path: &Path, reason: impl std::fmt::Display) -> ScribeError {
    ScribeError::Transcription {
        audio_path: audio_path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn transcribe_blocking(audio_path: &Path, profile: &ModelProfile) -> Result<Transcript> {
    let mut reader =
        hound::WavReader::open(audio_path).map_err(|e| transcribe_error(audio_path, e))?;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| transcribe_error(audio_path, e))?;

    let model_path = profile.model_path.to_string_lossy();
    if !profile.model_path.exists() {
        return Err(transcribe_error(
            audio_path,
            format!("model file not found: {model_path}"),
        ));
    }

    let ctx = WhisperContext::new_with_params(&model_path, WhisperContextParameters::default())
        .map_err(|e| transcribe_error(audio_path, format!("failed to load model: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    if let Some(lang) = profile.language.as_deref() {
        params.set_language(Some(lang));
    }
    if let Some(threads) = profile.threads {
        params.set_n_threads(threads as i32);
    }

    let mut state = ctx
        .create_state()
        .map_err(|e| transcribe_error(audio_path, format!("failed to create state: {e}")))?;
    state
        .full(params, &samples)
        .map_err(|e| transcribe_error(audio_path, format!("inference failed: {e}")))?;

    let mut text = String::new();
    let mut segments: Vec<Segment> = Vec::new();
    for segment in state.as_iter() {
        let Ok(seg_text) = segment.to_str() else {
            continue;
        };
        segments.push(Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text: seg_text.to_string(),
        });
        text.push_str(seg_text);
    }

    let language_index = state.full_lang_id_from_state();
    let language = whisper_rs::get_lang_str(language_index)
        .unwrap_or("unknown")
        .to_string();
    let duration_seconds = segments.last().map(|s| s.end).unwrap_or(0.0);

    Ok(Transcript {
        text,
        language,
        duration_seconds,
        segments,
    })
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, asset: &AudioAsset, profile: &ModelProfile) -> Result<Transcript> {
        let audio_path = asset.path.clone();
        let profile = profile.clone();
        tokio::task::spawn_blocking(move || transcribe_blocking(&audio_path, &profile))
            .await
            .map_err(|e| ScribeError::Transcription {
                audio_path: asset.path.clone(),
                reason: format!("transcription task aborted: {e}"),
            })?
    }
}
