use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ScribeError;
use crate::types::{SourceDescriptor, Transcript};

/// Pipeline stages for one job. Transitions are strictly forward;
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Acquiring,
    Transcribing,
    Normalizing,
    Optimizing,
    Persisting,
    Completed,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    fn order(self) -> u8 {
        match self {
            Stage::Pending => 0,
            Stage::Acquiring => 1,
            Stage::Transcribing => 2,
            Stage::Normalizing => 3,
            Stage::Optimizing => 4,
            Stage::Persisting => 5,
            Stage::Completed => 6,
            Stage::Failed => 7,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutput {
    pub pass: String,
    pub text: String,
}

/// A pass that failed without failing the job. Sits next to `pass_outputs`
/// so partial optimization results stay attributable.
#[derive(Debug, Clone, Serialize)]
pub struct PassFailure {
    pub pass: String,
    pub reason: String,
}

/// One source descriptor's full pipeline execution state.
///
/// Owned exclusively by the item pipeline while running; the batch
/// orchestrator only sees it back once it is terminal.
#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub descriptor: SourceDescriptor,
    pub status: Stage,
    pub raw_transcript: Option<Transcript>,
    pub normalized_transcript: Option<String>,
    /// Outputs of completed passes, in resolved-plan order.
    pub pass_outputs: Vec<PassOutput>,
    pub pass_errors: Vec<PassFailure>,
    pub artifacts: Vec<PathBuf>,
    /// Completed, but at least one requested pass failed.
    pub partial_optimization: bool,
    pub error: Option<ScribeError>,
    /// Stage entry times, for reporting and debugging.
    pub stage_log: Vec<(Stage, DateTime<Utc>)>,
}

impl Job {
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self {
            id: descriptor.job_id(),
            descriptor,
            status: Stage::Pending,
            raw_transcript: None,
            normalized_transcript: None,
            pass_outputs: Vec::new(),
            pass_errors: Vec::new(),
            artifacts: Vec::new(),
            partial_optimization: false,
            error: None,
            stage_log: vec![(Stage::Pending, Utc::now())],
        }
    }

    /// Move to the next stage. Forward-only: a job never revisits a stage.
    pub fn enter(&mut self, stage: Stage) {
        debug_assert!(!self.status.is_terminal(), "terminal job re-entered");
        debug_assert!(
            stage.order() > self.status.order() || stage == Stage::Failed,
            "stage transition {:?} -> {:?} is not forward",
            self.status,
            stage,
        );
        tracing::debug!(job = %self.id, from = ?self.status, to = ?stage, "stage transition");
        self.status = stage;
        self.stage_log.push((stage, Utc::now()));
    }

    pub fn fail(&mut self, error: ScribeError) {
        self.error = Some(error);
        self.enter(Stage::Failed);
    }

    pub fn is_completed(&self) -> bool {
        self.status == Stage::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceDescriptor;

    #[test]
    fn new_job_starts_pending() {
        let job = Job::new(SourceDescriptor::remote("https://youtu.be/dQw4w9WgXcQ"));
        assert_eq!(job.status, Stage::Pending);
        assert_eq!(job.stage_log.len(), 1);
    }

    #[test]
    fn forward_transitions_are_logged() {
        let mut job = Job::new(SourceDescriptor::remote("https://youtu.be/dQw4w9WgXcQ"));
        job.enter(Stage::Acquiring);
        job.enter(Stage::Transcribing);
        assert_eq!(job.status, Stage::Transcribing);
        assert_eq!(job.stage_log.len(), 3);
    }

    #[test]
    fn failure_is_reachable_from_any_stage() {
        let mut job = Job::new(SourceDescriptor::remote("https://youtu.be/dQw4w9WgXcQ"));
        job.enter(Stage::Acquiring);
        job.fail(ScribeError::Canceled);
        assert_eq!(job.status, Stage::Failed);
        assert!(job.error.is_some());
    }
}
