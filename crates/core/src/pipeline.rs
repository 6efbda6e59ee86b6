//! Item pipeline: the full stage sequence for exactly one source.
//!
//! Stages run strictly forward (acquire → transcribe → normalize → optimize
//! → persist), failure is isolated at whichever stage it occurs, and the
//! transient audio asset is removed by an unconditional cleanup finalizer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backends::Backends;
use crate::catalog::Catalog;
use crate::chain::{ExecutionPlan, PassInput, PlannedPass};
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::format;
use crate::job::{Job, PassFailure, PassOutput, Stage};
use crate::retry::{RetryPolicy, call_with_retry};
use crate::store::{ArtifactKind, ArtifactStore};
use crate::types::{AudioAsset, SourceDescriptor};

pub struct ItemPipeline {
    backends: Backends,
    store: Arc<dyn ArtifactStore>,
    catalog: Arc<Catalog>,
    config: Arc<Config>,
    /// Batch-wide gate: the transcription backend is a scarce resource, at
    /// most one job transcribes at a time.
    stt_gate: Arc<Mutex<()>>,
}

impl ItemPipeline {
    pub fn new(
        backends: Backends,
        store: Arc<dyn ArtifactStore>,
        catalog: Arc<Catalog>,
        config: Arc<Config>,
        stt_gate: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            backends,
            store,
            catalog,
            config,
            stt_gate,
        }
    }

    /// Drive one descriptor to a terminal state. Never panics the caller:
    /// every failure ends up recorded on the returned job.
    pub async fn run(
        &self,
        descriptor: SourceDescriptor,
        plan: &ExecutionPlan,
        cancel: &CancellationToken,
    ) -> Job {
        let mut job = Job::new(descriptor);
        let mut audio = None;

        match self.execute(&mut job, &mut audio, plan, cancel).await {
            Ok(()) => {
                tracing::info!(job = %job.id, partial = job.partial_optimization, "job completed");
            }
            Err(error) => {
                if matches!(error, ScribeError::Canceled) {
                    tracing::info!(job = %job.id, stage = ?job.status, "job canceled");
                } else {
                    tracing::warn!(job = %job.id, stage = ?job.status, error = %error, "job failed");
                }
                job.fail(error);
            }
        }

        // Guaranteed finalizer: the transient audio asset is removed no
        // matter which stage the job ended in.
        self.cleanup(&job, audio.as_ref()).await;
        job
    }

    async fn execute(
        &self,
        job: &mut Job,
        audio: &mut Option<AudioAsset>,
        plan: &ExecutionPlan,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let policy = RetryPolicy::from_config(&self.config);
        let descriptor = job.descriptor.clone();

        ensure_not_canceled(cancel)?;
        job.enter(Stage::Acquiring);
        let asset = call_with_retry("acquire", policy, || {
            self.backends.source.acquire(&descriptor, &self.config.work_dir)
        })
        .await?;
        *audio = Some(asset.clone());

        ensure_not_canceled(cancel)?;
        job.enter(Stage::Transcribing);
        let profile = self.config.model_profile();
        let transcript = {
            let _gate = self.stt_gate.lock().await;
            call_with_retry("transcribe", policy, || {
                self.backends.stt.transcribe(&asset, &profile)
            })
            .await?
        };
        tracing::debug!(
            job = %job.id,
            language = %transcript.language,
            duration_seconds = transcript.duration_seconds,
            "transcription finished"
        );
        job.raw_transcript = Some(transcript.clone());

        ensure_not_canceled(cancel)?;
        job.enter(Stage::Normalizing);
        let normalized = match self.backends.normalizer.normalize(&transcript.text) {
            Ok(text) => text,
            Err(error) => {
                // Normalization can never fail the job: degrade to identity.
                tracing::warn!(job = %job.id, error = %error, "normalization degraded to identity");
                transcript.text.clone()
            }
        };
        job.normalized_transcript = Some(normalized.clone());

        ensure_not_canceled(cancel)?;
        job.enter(Stage::Optimizing);
        self.run_passes(job, &normalized, plan, policy).await?;

        ensure_not_canceled(cancel)?;
        job.enter(Stage::Persisting);
        self.persist(job).await?;

        job.enter(Stage::Completed);
        Ok(())
    }

    /// Execute the resolved plan: producer passes first (their output feeds
    /// the rest), then all remaining passes concurrently. A single pass
    /// failure is recorded and recovered; the job fails only when zero
    /// passes succeed.
    async fn run_passes(
        &self,
        job: &mut Job,
        normalized: &str,
        plan: &ExecutionPlan,
        policy: RetryPolicy,
    ) -> Result<()> {
        let producers: HashSet<&str> = plan
            .passes()
            .iter()
            .filter_map(|p| match &p.input {
                PassInput::Output(name) => Some(name.as_str()),
                PassInput::NormalizedTranscript => None,
            })
            .collect();

        let mut outputs: HashMap<String, String> = HashMap::new();
        let mut failures: Vec<PassFailure> = Vec::new();

        for pass in plan.passes() {
            if !producers.contains(pass.name.as_str()) {
                continue;
            }
            let input = self.pass_input(pass, normalized, &outputs);
            match self.run_single_pass(&pass.name, &input, policy).await {
                Ok(text) => {
                    outputs.insert(pass.name.clone(), text);
                }
                Err(error) => failures.push(PassFailure {
                    pass: pass.name.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        let mut set: JoinSet<(String, Result<String>)> = JoinSet::new();
        for pass in plan.passes() {
            if producers.contains(pass.name.as_str()) {
                continue;
            }
            let name = pass.name.clone();
            let template = match self.catalog.get(&name) {
                Some(template) => template.content.clone(),
                None => {
                    // The plan was resolved against this catalog; a miss here
                    // means the caller mixed catalogs.
                    return Err(ScribeError::UnknownPass { name });
                }
            };
            let input = self.pass_input(pass, normalized, &outputs);
            let optimizer = Arc::clone(&self.backends.optimizer);
            set.spawn(async move {
                let result = call_with_retry("optimize", policy, || {
                    optimizer.optimize(&template, &input)
                })
                .await;
                (name, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Ok(text))) => {
                    outputs.insert(name, text);
                }
                Ok((name, Err(error))) => {
                    tracing::warn!(job = %job.id, pass = %name, error = %error, "pass failed");
                    failures.push(PassFailure {
                        pass: name,
                        reason: error.to_string(),
                    });
                }
                Err(join_error) => {
                    tracing::error!(job = %job.id, error = %join_error, "pass task aborted");
                }
            }
        }

        // Completion order is unspecified; recorded order follows the plan.
        for pass in plan.passes() {
            if let Some(text) = outputs.remove(&pass.name) {
                job.pass_outputs.push(PassOutput {
                    pass: pass.name.clone(),
                    text,
                });
            }
        }
        job.pass_errors = failures;

        if job.pass_outputs.is_empty() {
            return Err(ScribeError::AllPassesFailed {
                attempted: plan.len(),
            });
        }
        job.partial_optimization = !job.pass_errors.is_empty();
        Ok(())
    }

    /// Resolve a pass's declared input. When the producing pass failed, its
    /// consumers fall back to the normalized transcript so partial credit
    /// is still possible.
    fn pass_input(
        &self,
        pass: &PlannedPass,
        normalized: &str,
        outputs: &HashMap<String, String>,
    ) -> String {
        match &pass.input {
            PassInput::NormalizedTranscript => normalized.to_string(),
            PassInput::Output(producer) => match outputs.get(producer) {
                Some(text) => text.clone(),
                None => {
                    tracing::debug!(
                        pass = %pass.name,
                        producer = %producer,
                        "producer output unavailable, falling back to transcript"
                    );
                    normalized.to_string()
                }
            },
        }
    }

    async fn run_single_pass(
        &self,
        name: &str,
        input: &str,
        policy: RetryPolicy,
    ) -> Result<String> {
        let template = self
            .catalog
            .get(name)
            .ok_or_else(|| ScribeError::UnknownPass {
                name: name.to_string(),
            })?;
        call_with_retry("optimize", policy, || {
            self.backends.optimizer.optimize(&template.content, input)
        })
        .await
    }

    async fn persist(&self, job: &mut Job) -> Result<()> {
        let persist_error = |reason: String| ScribeError::Persistence {
            target: job.id.clone(),
            reason,
        };

        if let Some(transcript) = &job.raw_transcript {
            let json = serde_json::to_string_pretty(transcript)
                .map_err(|e| persist_error(e.to_string()))?;
            let path = self
                .store
                .write_artifact(&job.id, &ArtifactKind::RawTranscript, &json)
                .await?;
            job.artifacts.push(path);

            let markdown = format::transcript_markdown(transcript);
            let path = self
                .store
                .write_artifact(&job.id, &ArtifactKind::TranscriptMarkdown, &markdown)
                .await?;
            job.artifacts.push(path);
        }

        for output in &job.pass_outputs {
            let kind = ArtifactKind::PassOutput(output.pass.clone());
            let path = self.store.write_artifact(&job.id, &kind, &output.text).await?;
            job.artifacts.push(path);
        }
        Ok(())
    }

    async fn cleanup(&self, job: &Job, audio: Option<&AudioAsset>) {
        if self.config.keep_audio {
            return;
        }
        let Some(asset) = audio else { return };
        match tokio::fs::remove_file(&asset.path).await {
            Ok(()) => tracing::debug!(job = %job.id, "transient audio removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(job = %job.id, path = %asset.path.display(), error = %e, "cleanup failed")
            }
        }
    }
}

fn ensure_not_canceled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ScribeError::Canceled)
    } else {
        Ok(())
    }
}
