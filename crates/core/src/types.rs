use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Ordering key for search-derived batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    #[default]
    Relevance,
    Newest,
    MostPlayed,
}

/// One media source to process. Immutable once created.
///
/// A `SearchQuery` expands to zero or more `RemoteUrl` descriptors at
/// batch-expansion time and is never re-expanded later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    RemoteUrl { url: String },
    LocalPath { path: PathBuf },
    SearchQuery { query: String, count: usize, order: SearchOrder },
}

impl SourceDescriptor {
    pub fn remote(url: impl Into<String>) -> Self {
        SourceDescriptor::RemoteUrl { url: url.into() }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::LocalPath { path: path.into() }
    }

    /// Stable job id derived from the descriptor, used for dedup, logging
    /// and artifact directory names.
    ///
    /// Platform video ids are preferred when they can be extracted from the
    /// URL; everything else falls back to a hash of the descriptor.
    pub fn job_id(&self) -> String {
        match self {
            SourceDescriptor::RemoteUrl { url } => extract_video_id(url)
                .unwrap_or_else(|| format!("url-{:016x}", stable_hash(url))),
            SourceDescriptor::LocalPath { path } => {
                let stem = path
                    .file_stem()
                    .map(|s| sanitize(&s.to_string_lossy()))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "file".to_string());
                format!("{stem}-{:08x}", stable_hash(path) as u32)
            }
            SourceDescriptor::SearchQuery { query, .. } => {
                format!("search-{:016x}", stable_hash(query))
            }
        }
    }

    /// Human-readable form for logs and report entries.
    pub fn display(&self) -> String {
        match self {
            SourceDescriptor::RemoteUrl { url } => url.clone(),
            SourceDescriptor::LocalPath { path } => path.display().to_string(),
            SourceDescriptor::SearchQuery { query, count, .. } => {
                format!("search:{query} (top {count})")
            }
        }
    }
}

fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Extract a platform video id from a URL (Bilibili BV id, YouTube watch id).
fn extract_video_id(url: &str) -> Option<String> {
    if let Some(idx) = url.find("BV") {
        let id: String = url[idx + 2..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if id.len() >= 10 {
            return Some(format!("BV{}", &id[..10]));
        }
    }

    let tail = url
        .split_once("v=")
        .map(|(_, rest)| rest)
        .or_else(|| url.split_once("youtu.be/").map(|(_, rest)| rest))?;
    let id: String = tail
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (id.len() == 11).then_some(id)
}

/// Local audio produced by the acquisition backend. Transient: removed by the
/// pipeline's cleanup finalizer unless the config says otherwise.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
}

/// Transcription model selection passed to the speech-to-text backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model_path: PathBuf,
    pub language: Option<String>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    pub duration_seconds: f64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilibili_url_yields_bv_id() {
        let d = SourceDescriptor::remote("https://www.bilibili.com/video/BV1vc411b7Wa");
        assert_eq!(d.job_id(), "BV1vc411b7Wa");
    }

    #[test]
    fn youtube_url_yields_watch_id() {
        let d = SourceDescriptor::remote("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(d.job_id(), "dQw4w9WgXcQ");
        let d = SourceDescriptor::remote("https://youtu.be/dQw4w9WgXcQ?t=1");
        assert_eq!(d.job_id(), "dQw4w9WgXcQ");
    }

    #[test]
    fn opaque_url_falls_back_to_hash() {
        let d = SourceDescriptor::remote("https://example.com/talk.mp4");
        assert!(d.job_id().starts_with("url-"));
        assert_eq!(d.job_id(), d.job_id());
    }

    #[test]
    fn local_path_id_keeps_stem() {
        let d = SourceDescriptor::local("/media/lecture 01.mp4");
        assert!(d.job_id().starts_with("lecture_01-"));
    }
}
