use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("acquisition failed for {source}: {reason}")]
    Acquisition { source: String, reason: String },

    #[error("transcription failed for {audio_path}: {reason}")]
    Transcription { audio_path: PathBuf, reason: String },

    #[error("unknown pass: {name}")]
    UnknownPass { name: String },

    #[error("optimization failed: {reason}")]
    Optimization { transient: bool, reason: String },

    #[error("all {attempted} requested passes failed")]
    AllPassesFailed { attempted: usize },

    #[error("persistence failed for {target}: {reason}")]
    Persistence { target: String, reason: String },

    #[error("search failed for '{query}': {reason}")]
    Search { query: String, reason: String },

    #[error("invalid template catalog: {reason}")]
    Catalog { reason: String },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("batch canceled")]
    Canceled,

    #[error("missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScribeError>;

impl ScribeError {
    /// Stable kind string recorded in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ScribeError::Acquisition { .. } => "acquisition",
            ScribeError::Transcription { .. } => "transcription",
            ScribeError::UnknownPass { .. } => "unknown_pass",
            ScribeError::Optimization { .. } => "optimization",
            ScribeError::AllPassesFailed { .. } => "all_passes_failed",
            ScribeError::Persistence { .. } => "persistence",
            ScribeError::Search { .. } => "search",
            ScribeError::Catalog { .. } => "catalog",
            ScribeError::Timeout { .. } => "timeout",
            ScribeError::Canceled => "canceled",
            ScribeError::MissingApiKey { .. } => "missing_api_key",
            ScribeError::Io(_) => "io",
            ScribeError::Json(_) => "json",
            ScribeError::Config(_) => "config",
            ScribeError::Api(_) => "api",
        }
    }

    /// Whether a backend call that produced this error is worth retrying.
    ///
    /// Timeouts, rate limits and transport hiccups are transient; malformed
    /// input, auth rejections and everything else fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ScribeError::Optimization { transient, .. } => *transient,
            ScribeError::Timeout { .. } => true,
            ScribeError::Api(e) => e.is_timeout() || e.is_connect(),
            ScribeError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}
