use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::error::{Result, ScribeError};
use crate::report::BatchReport;

/// What a per-job artifact contains; decides its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Full transcript with segments and metadata, as JSON.
    RawTranscript,
    /// Timestamped transcript rendered as markdown.
    TranscriptMarkdown,
    /// Output of one optimization pass.
    PassOutput(String),
}

impl ArtifactKind {
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKind::RawTranscript => "transcript.json".to_string(),
            ArtifactKind::TranscriptMarkdown => "transcript.md".to_string(),
            ArtifactKind::PassOutput(pass) => format!("{pass}.md"),
        }
    }
}

/// Durable storage for per-job artifacts and the batch report.
///
/// Implementations must be crash-safe per item: a partially written artifact
/// must never be observable under its final name.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn write_artifact(
        &self,
        job_id: &str,
        kind: &ArtifactKind,
        content: &str,
    ) -> Result<PathBuf>;

    async fn write_report(&self, report: &BatchReport) -> Result<PathBuf>;
}

/// Filesystem store: `<root>/<job_id>/<artifact>`, reports at the root.
///
/// Writes go to a temp file in the destination directory first and are
/// renamed into place, so readers only ever see complete artifacts.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `write_report` puts a given report.
    pub fn report_path(&self, report: &BatchReport) -> PathBuf {
        self.root
            .join(format!("report-{}.json", report.batch_id.simple()))
    }

    async fn write_atomic(&self, dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
        let target = dir.join(file_name);
        let err = |reason: String| ScribeError::Persistence {
            target: target.display().to_string(),
            reason,
        };

        fs::create_dir_all(dir).await.map_err(|e| err(e.to_string()))?;
        let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, content).await.map_err(|e| err(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err(e.to_string()));
        }
        Ok(target)
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn write_artifact(
        &self,
        job_id: &str,
        kind: &ArtifactKind,
        content: &str,
    ) -> Result<PathBuf> {
        let dir = self.root.join(job_id);
        let path = self.write_atomic(&dir, &kind.file_name(), content).await?;
        tracing::debug!(job = job_id, path = %path.display(), "artifact written");
        Ok(path)
    }

    async fn write_report(&self, report: &BatchReport) -> Result<PathBuf> {
        let target = self.report_path(report);
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.json".to_string());
        let json = serde_json::to_string_pretty(report)?;
        self.write_atomic(&self.root, &file_name, &json).await
    }
}
