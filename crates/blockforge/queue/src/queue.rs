//! Compilation job queue and worker pool.
//!
//! ```text
//! submit ──► JobStore (queued) ──► mpsc<JobId> ──► worker 0..N
//!                                                   │
//!                          Workspace::create ◄──────┤
//!                          Toolchain::run    ◄──────┤
//!                          ArtifactStore::put ◄─────┤
//!                          JobStore (completed | failed)
//! ```
//!
//! Submission never waits on compilation: the record is persisted, the id is
//! pushed onto a bounded channel, and the call returns. Workers share the
//! receiving end; each job holds one worker and one workspace until it is
//! terminal. There are no retries.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use blockforge_codegen::{SourceValidator, MAX_SOURCE_BYTES};
use blockforge_toolchain::{ToolchainSet, WorkspaceManager};
use blockforge_types::{
    Artifact, ErrorCode, ErrorRecord, JobId, JobInput, JobKind, JobRecord, JobState,
    JobTransition,
};

use crate::error::{QueueError, QueueResult, StoreError};
use crate::live::{progress, LiveTable};
use crate::store::{ArtifactStore, JobStore};
use crate::submission::Submission;

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of worker tasks
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the submission channel; submissions beyond it are
    /// rejected
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Byte ceiling enforced by the source validator
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Delay before a job whose start could not be recorded is offered to
    /// the workers again
    #[serde(default = "default_start_retry_ms")]
    pub start_retry_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
            max_source_bytes: default_max_source_bytes(),
            start_retry_ms: default_start_retry_ms(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    256
}

fn default_max_source_bytes() -> usize {
    MAX_SOURCE_BYTES
}

fn default_start_retry_ms() -> u64 {
    500
}

/// What startup recovery did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs found `running` with no worker, now `failed`
    pub orphaned: Vec<JobId>,
    /// Jobs still `queued`, pushed back onto the channel
    pub requeued: Vec<JobId>,
    /// Stale workspace directories removed
    pub workspaces_removed: usize,
}

/// The job queue.
pub struct JobQueue {
    config: QueueConfig,
    store: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    toolchains: ToolchainSet,
    workspaces: WorkspaceManager,
    validator: SourceValidator,
    live: LiveTable,
    sender: RwLock<Option<mpsc::Sender<JobId>>>,
    receiver: Mutex<Option<mpsc::Receiver<JobId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        toolchains: ToolchainSet,
        workspaces: WorkspaceManager,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        Arc::new(Self {
            validator: SourceValidator::new(config.max_source_bytes),
            config,
            store,
            artifacts,
            toolchains,
            workspaces,
            live: LiveTable::new(),
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            workers: Mutex::new(Vec::new()),
        })
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifacts
    }

    pub fn live(&self) -> &LiveTable {
        &self.live
    }

    pub fn worker_count(&self) -> usize {
        self.config.workers.max(1)
    }

    /// Resolve a client request and submit it.
    pub async fn submit_request(&self, submission: Submission) -> QueueResult<JobId> {
        let (kind, input) = submission.resolve()?;
        self.submit(kind, input).await
    }

    /// Validate `input`, persist a `queued` record and hand its id to the
    /// workers. Returns as soon as the id is on the channel.
    pub async fn submit(&self, kind: JobKind, input: JobInput) -> QueueResult<JobId> {
        let outcome = self
            .validator
            .validate(&input.source, kind.target_language());
        if !outcome.valid {
            return Err(QueueError::Validation {
                code: outcome.code.unwrap_or(ErrorCode::InvalidInput),
                message: outcome.error.unwrap_or_default(),
            });
        }

        let sender = self.sender.read().await;
        let sender = sender.as_ref().ok_or(QueueError::Closed)?;
        let permit = sender.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => QueueError::Full,
            TrySendError::Closed(()) => QueueError::Closed,
        })?;

        let record = JobRecord::new(kind, input);
        let job_id = record.job_id.clone();
        self.store.insert(record).await?;
        self.live.queued(&job_id).await;
        permit.send(job_id.clone());

        tracing::info!(job_id = %job_id, kind = %kind, "Job submitted");
        Ok(job_id)
    }

    /// Run crash recovery, then spawn the worker pool.
    pub async fn start(self: &Arc<Self>) -> QueueResult<RecoveryReport> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or(QueueError::AlreadyStarted)?;

        let report = self.recover().await?;

        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = self.workers.lock().await;
        for worker_id in 0..self.worker_count() {
            let queue = Arc::clone(self);
            let receiver = Arc::clone(&receiver);
            workers.push(tokio::spawn(async move {
                queue.worker_loop(worker_id, receiver).await;
            }));
        }

        tracing::info!(workers = self.worker_count(), "Worker pool started");
        Ok(report)
    }

    /// Close the submission channel and wait for workers to drain it.
    pub async fn shutdown(&self) {
        self.sender.write().await.take();
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        tracing::info!("Worker pool drained");
    }

    /// Fail orphaned `running` jobs, sweep stale workspaces and re-enqueue
    /// `queued` jobs. Must run before any worker exists.
    async fn recover(&self) -> QueueResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for record in self.store.list_by_state(JobState::Running).await? {
            let error = ErrorRecord::new(ErrorCode::InfraError, "job orphaned by restart");
            match self
                .store
                .transition(&record.job_id, JobTransition::Fail { error })
                .await
            {
                Ok(_) => {
                    tracing::warn!(job_id = %record.job_id, "Orphaned running job marked failed");
                    report.orphaned.push(record.job_id);
                }
                Err(StoreError::InvalidTransition(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        match self.workspaces.sweep_stale() {
            Ok(removed) => report.workspaces_removed = removed,
            Err(e) => tracing::warn!(error = %e, "Workspace sweep failed"),
        }

        for record in self.store.list_by_state(JobState::Queued).await? {
            if self.live.get(&record.job_id).await.is_some() {
                continue;
            }
            self.live.queued(&record.job_id).await;
            report.requeued.push(record.job_id);
        }

        if !report.requeued.is_empty() {
            let sender = self.sender.read().await.clone().ok_or(QueueError::Closed)?;
            let ids = report.requeued.clone();
            tokio::spawn(async move {
                for id in ids {
                    if sender.send(id).await.is_err() {
                        break;
                    }
                }
            });
        }

        tracing::info!(
            orphaned = report.orphaned.len(),
            requeued = report.requeued.len(),
            workspaces_removed = report.workspaces_removed,
            "Recovery complete"
        );
        Ok(report)
    }

    async fn worker_loop(&self, worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<JobId>>>) {
        tracing::debug!(worker_id, "Worker started");
        loop {
            let next = receiver.lock().await.recv().await;
            let Some(job_id) = next else {
                break;
            };

            let processed = AssertUnwindSafe(self.process(&job_id)).catch_unwind().await;
            if processed.is_err() {
                tracing::error!(worker_id, job_id = %job_id, "Worker panicked while processing job");
                self.finish(&job_id, JobTransition::Fail { error: ErrorRecord::infra() })
                    .await;
            }
        }
        tracing::debug!(worker_id, "Worker stopped");
    }

    async fn process(&self, job_id: &JobId) {
        let record = match self.store.transition(job_id, JobTransition::Start).await {
            Ok(record) => record,
            Err(StoreError::InvalidTransition(e)) => {
                tracing::warn!(job_id = %job_id, error = %e, "Job no longer queued, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record job start, retrying");
                self.retry_start(job_id.clone()).await;
                return;
            }
        };
        self.live.running(job_id, progress::QUEUED).await;
        tracing::info!(job_id = %job_id, kind = %record.contract_type, "Job started");

        let transition = match self.compile(&record).await {
            Ok(artifact) => {
                let artifact_id = artifact.id.clone();
                match self.artifacts.put(artifact).await {
                    Ok(()) => JobTransition::Complete { artifact_id },
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to store artifact");
                        JobTransition::Fail {
                            error: ErrorRecord::infra(),
                        }
                    }
                }
            }
            Err(error) => JobTransition::Fail { error },
        };

        self.finish(job_id, transition).await;
    }

    /// One compilation attempt. The workspace is released on every path:
    /// explicitly here, or by drop on unwind.
    async fn compile(&self, record: &JobRecord) -> Result<Artifact, ErrorRecord> {
        let job_id = &record.job_id;
        let kind = record.contract_type;
        let input = &record.input;

        let outcome = self.validator.validate(&input.source, kind.target_language());
        if !outcome.valid {
            return Err(ErrorRecord::new(
                outcome.code.unwrap_or(ErrorCode::InvalidInput),
                outcome.error.unwrap_or_default(),
            ));
        }

        let mut workspace = self.workspaces.workspace();
        let path = workspace.create().map_err(|e| {
            tracing::warn!(job_id = %job_id, error = %e, "Workspace allocation failed");
            ErrorRecord::resource(e.to_string())
        })?;
        self.live.running(job_id, progress::WORKSPACE_READY).await;

        self.live.running(job_id, progress::TOOLCHAIN_STARTED).await;
        let result = self.toolchains.for_kind(kind).run(&path, input).await;

        if let Err(e) = workspace.cleanup() {
            tracing::warn!(job_id = %job_id, error = %e, "Workspace cleanup failed");
        }

        match result {
            Ok(output) => {
                self.live.running(job_id, progress::OUTPUT_COLLECTED).await;
                Ok(output.artifact)
            }
            Err(e) => {
                if e.is_infra() {
                    tracing::error!(job_id = %job_id, error = %e, "Toolchain infrastructure failure");
                } else {
                    tracing::info!(job_id = %job_id, error = %e, "Compilation failed");
                }
                Err(e.to_record())
            }
        }
    }

    /// Offer a still-`queued` job to the workers again after a delay. Once
    /// the queue is shut down the record stays `queued` and the next
    /// `start` re-enqueues it.
    async fn retry_start(&self, job_id: JobId) {
        let Some(sender) = self.sender.read().await.clone() else {
            tracing::warn!(job_id = %job_id, "Queue closed, job left queued for recovery");
            self.live.finish(&job_id).await;
            return;
        };
        let delay = std::time::Duration::from_millis(self.config.start_retry_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(job_id.clone()).await.is_err() {
                tracing::warn!(job_id = %job_id, "Queue closed, job left queued for recovery");
            }
        });
    }

    async fn finish(&self, job_id: &JobId, transition: JobTransition) {
        match self.store.transition(job_id, transition).await {
            Ok(record) => {
                tracing::info!(job_id = %job_id, state = %record.status, "Job finished");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record job outcome");
            }
        }
        self.live.finish(job_id).await;
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.config)
            .field("toolchains", &self.toolchains)
            .finish_non_exhaustive()
    }
}
