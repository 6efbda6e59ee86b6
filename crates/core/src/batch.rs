//! Batch orchestrator: expands the requested sources into jobs, fans them
//! out under a bounded concurrency policy and aggregates terminal outcomes
//! into one consolidated report.
//!
//! One job's failure never halts its siblings; only an explicit
//! cancellation stops the batch, and even then every already-submitted job
//! is driven to a terminal state before the report is finalized.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backends::Backends;
use crate::catalog::Catalog;
use crate::chain;
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::pipeline::ItemPipeline;
use crate::report::BatchReport;
use crate::store::ArtifactStore;
use crate::types::SourceDescriptor;

pub struct BatchOrchestrator {
    backends: Backends,
    store: Arc<dyn ArtifactStore>,
    catalog: Arc<Catalog>,
    config: Arc<Config>,
}

impl BatchOrchestrator {
    pub fn new(
        backends: Backends,
        store: Arc<dyn ArtifactStore>,
        catalog: Arc<Catalog>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            backends,
            store,
            catalog,
            config,
        }
    }

    /// Run a batch to completion (or clean cancellation) and persist the
    /// report. The run itself succeeds regardless of individual job
    /// outcomes; only batch-level failures (unresolvable plan, search
    /// expansion, report persistence) surface as errors.
    pub async fn run(
        &self,
        sources: Vec<SourceDescriptor>,
        passes: &[String],
        cancel: CancellationToken,
    ) -> Result<BatchReport> {
        // Resolving the chain first makes an unknown pass fail the whole
        // batch before any backend call happens.
        let plan = Arc::new(chain::resolve(passes, &self.catalog)?);
        let descriptors = dedup(self.expand(sources).await?);

        let mut report = BatchReport::new();
        tracing::info!(
            batch = %report.batch_id,
            jobs = descriptors.len(),
            passes = plan.len(),
            concurrency = self.config.concurrency,
            "batch started"
        );

        let pipeline = Arc::new(ItemPipeline::new(
            self.backends.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.catalog),
            Arc::clone(&self.config),
            Arc::new(Mutex::new(())),
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let mut jobs: JoinSet<crate::job::Job> = JoinSet::new();
        for descriptor in descriptors {
            if cancel.is_cancelled() {
                tracing::info!(batch = %report.batch_id, "canceled, remaining jobs not submitted");
                break;
            }
            let pipeline = Arc::clone(&pipeline);
            let plan = Arc::clone(&plan);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            jobs.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline.run(descriptor, &plan, &cancel).await
            });
        }

        // Entries land in completion order; each carries its descriptor so
        // interleaving stays unambiguous.
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(job) => report.record(&job),
                Err(join_error) => {
                    tracing::error!(batch = %report.batch_id, error = %join_error, "job task aborted");
                }
            }
        }

        report.finalize();
        let path = self.store.write_report(&report).await?;
        tracing::info!(
            batch = %report.batch_id,
            total = report.total,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            report = %path.display(),
            "batch finished"
        );
        Ok(report)
    }

    /// Resumption mode: re-run exactly the failures of a prior report as a
    /// fresh batch.
    pub async fn run_failed(
        &self,
        prior: &BatchReport,
        passes: &[String],
        cancel: CancellationToken,
    ) -> Result<BatchReport> {
        let descriptors = prior.failed_descriptors();
        tracing::info!(
            prior = %prior.batch_id,
            retrying = descriptors.len(),
            "retrying failed jobs from prior report"
        );
        self.run(descriptors, passes, cancel).await
    }

    /// Expand search-query descriptors into remote-URL descriptors. Runs
    /// once, before orchestration; expanded lists are never re-expanded.
    async fn expand(&self, sources: Vec<SourceDescriptor>) -> Result<Vec<SourceDescriptor>> {
        let mut descriptors = Vec::with_capacity(sources.len());
        for source in sources {
            match source {
                SourceDescriptor::SearchQuery { query, count, order } => {
                    let Some(search) = &self.backends.search else {
                        return Err(ScribeError::Search {
                            query,
                            reason: "no search backend configured".to_string(),
                        });
                    };
                    let found = search.search(&query, count, order).await?;
                    if found.is_empty() {
                        tracing::warn!(query, "search expanded to no results");
                    }
                    descriptors.extend(found);
                }
                other => descriptors.push(other),
            }
        }
        Ok(descriptors)
    }
}

/// Drop duplicate descriptors by job id, keeping the first occurrence.
fn dedup(descriptors: Vec<SourceDescriptor>) -> Vec<SourceDescriptor> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let id = descriptor.job_id();
        if seen.insert(id) {
            unique.push(descriptor);
        } else {
            tracing::debug!(source = %descriptor.display(), "dropping duplicate descriptor");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let descriptors = vec![
            SourceDescriptor::remote("https://youtu.be/aaaaaaaaaaa"),
            SourceDescriptor::remote("https://www.youtube.com/watch?v=aaaaaaaaaaa"),
            SourceDescriptor::remote("https://youtu.be/bbbbbbbbbbb"),
        ];
        let unique = dedup(descriptors);
        assert_eq!(unique.len(), 2);
        assert_eq!(
            unique[0],
            SourceDescriptor::remote("https://youtu.be/aaaaaaaaaaa")
        );
    }
}
