use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::job::Job;
use crate::types::SourceDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SucceededEntry {
    pub job_id: String,
    pub descriptor: SourceDescriptor,
    pub artifact_paths: Vec<PathBuf>,
    /// At least one requested pass failed, but the job still completed.
    #[serde(default)]
    pub partial_optimization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub job_id: String,
    pub descriptor: SourceDescriptor,
    pub error_kind: String,
    pub error_message: String,
}

/// Consolidated outcome of one batch. Built incrementally as jobs reach a
/// terminal state (entries are in completion order, not submission order)
/// and written once, at batch completion, as a single durable artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub total: usize,
    pub succeeded: Vec<SucceededEntry>,
    pub failed: Vec<FailedEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            total: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a terminal job. `total` counts recorded jobs, so the
    /// `succeeded + failed == total` invariant holds even when a canceled
    /// batch never submitted some descriptors.
    pub fn record(&mut self, job: &Job) {
        debug_assert!(job.status.is_terminal(), "recorded a non-terminal job");
        self.total += 1;
        if job.is_completed() {
            self.succeeded.push(SucceededEntry {
                job_id: job.id.clone(),
                descriptor: job.descriptor.clone(),
                artifact_paths: job.artifacts.clone(),
                partial_optimization: job.partial_optimization,
            });
        } else {
            let (error_kind, error_message) = match &job.error {
                Some(e) => (e.kind().to_string(), e.to_string()),
                None => ("unknown".to_string(), "job failed without error".to_string()),
            };
            self.failed.push(FailedEntry {
                job_id: job.id.clone(),
                descriptor: job.descriptor.clone(),
                error_kind,
                error_message,
            });
        }
    }

    pub fn finalize(&mut self) {
        debug_assert_eq!(self.total, self.succeeded.len() + self.failed.len());
        self.finished_at = Some(Utc::now());
    }

    /// Descriptors of failed jobs, in report order. Feed these back into a
    /// fresh batch to retry only the failures.
    pub fn failed_descriptors(&self) -> Vec<SourceDescriptor> {
        self.failed.iter().map(|f| f.descriptor.clone()).collect()
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
