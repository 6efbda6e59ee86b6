//! Backend capabilities the pipeline orchestrates, each behind a narrow
//! trait so implementations swap by substitution.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AudioAsset, ModelProfile, SearchOrder, SourceDescriptor, Transcript};

pub mod llm;
pub mod normalize;
pub mod search;
pub mod whisper;
pub mod ytdlp;

pub use llm::{ChatOptimizer, Provider};
pub use normalize::{IdentityNormalizer, WidthNormalizer};
pub use search::BilibiliSearch;
pub use whisper::WhisperTranscriber;
pub use ytdlp::YtDlpSource;

/// The full set of collaborators a batch runs against.
#[derive(Clone)]
pub struct Backends {
    pub source: std::sync::Arc<dyn AudioSource>,
    pub stt: std::sync::Arc<dyn SpeechToText>,
    pub normalizer: std::sync::Arc<dyn ScriptNormalizer>,
    pub optimizer: std::sync::Arc<dyn TextOptimizer>,
    /// Only needed when the batch contains search-query descriptors.
    pub search: Option<std::sync::Arc<dyn SearchProvider>>,
}

/// Turns a source descriptor into a local audio asset.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn acquire(&self, descriptor: &SourceDescriptor, workdir: &Path) -> Result<AudioAsset>;
}

/// Turns an audio asset into a transcript under a model profile.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, asset: &AudioAsset, profile: &ModelProfile) -> Result<Transcript>;
}

/// Canonicalizes a raw transcript. Callers treat failures as identity; this
/// backend can never abort a job.
pub trait ScriptNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Result<String>;
}

/// Applies one prompt template to input text. Errors carry a transient vs
/// permanent classification for the retry layer.
#[async_trait]
pub trait TextOptimizer: Send + Sync {
    async fn optimize(&self, template: &str, input: &str) -> Result<String>;
}

/// Expands a search query into remote-URL descriptors, before orchestration
/// begins.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        count: usize,
        order: SearchOrder,
    ) -> Result<Vec<SourceDescriptor>>;
}
