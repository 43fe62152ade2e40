//! Job Status Service: the client-facing projection of a job.
//!
//! Merges the durable record with the live table. While a job is running in
//! this process the live progress wins; a record stuck in `running` with no
//! live entry belongs to no worker and is reported as failed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use blockforge_types::{ArtifactId, ErrorCode, ErrorRecord, ExternalState, JobId, JobRecord, JobState};

use crate::error::QueueResult;
use crate::live::{progress, LiveJob, LiveTable};
use crate::queue::JobQueue;
use crate::store::{ArtifactStore, JobStore};

/// Result section of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub artifact_id: ArtifactId,
    pub contract_name: String,
    pub warnings: Vec<String>,
}

/// Externally visible status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: JobId,
    pub state: ExternalState,
    /// 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

/// Outcome of a status lookup. An unknown id is not a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
    Found(JobStatus),
    NotFound,
}

impl StatusLookup {
    pub fn found(self) -> Option<JobStatus> {
        match self {
            Self::Found(status) => Some(status),
            Self::NotFound => None,
        }
    }
}

/// Read-only status projection.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    live: LiveTable,
}

impl StatusService {
    pub fn new(store: Arc<dyn JobStore>, artifacts: Arc<dyn ArtifactStore>, live: LiveTable) -> Self {
        Self {
            store,
            artifacts,
            live,
        }
    }

    pub fn for_queue(queue: &JobQueue) -> Self {
        Self::new(
            Arc::clone(queue.store()),
            Arc::clone(queue.artifacts()),
            queue.live().clone(),
        )
    }

    pub async fn get_status(&self, job_id: &JobId) -> QueueResult<StatusLookup> {
        // Workers write the terminal record before dropping the live entry,
        // so reading live first means "running, no live entry" can only be a
        // job no worker owns.
        let live = self.live.get(job_id).await;
        let record = self.store.get(job_id).await?;

        let status = match (record, live) {
            (None, None) => return Ok(StatusLookup::NotFound),
            (None, Some(live)) => JobStatus {
                job_id: job_id.clone(),
                state: live.state.external(),
                progress: live.progress,
                result: None,
                error: None,
            },
            (Some(record), live) => self.project(record, live).await?,
        };
        Ok(StatusLookup::Found(status))
    }

    async fn project(&self, record: JobRecord, live: Option<LiveJob>) -> QueueResult<JobStatus> {
        let mut status = JobStatus {
            job_id: record.job_id.clone(),
            state: record.status.external(),
            progress: progress::QUEUED,
            result: None,
            error: None,
        };

        match (record.status, live) {
            (JobState::Queued, _) => {}
            (JobState::Running, Some(live)) => status.progress = live.progress,
            (JobState::Running, None) => {
                status.state = ExternalState::Failed;
                status.progress = progress::TERMINAL;
                status.error = Some(ErrorRecord::infra());
            }
            (JobState::Completed, _) => {
                status.progress = progress::TERMINAL;
                if let Some(artifact_id) = record.artifact_id {
                    let artifact = self.artifacts.get(&artifact_id).await?;
                    status.result = Some(JobResult {
                        artifact_id,
                        contract_name: record.input.contract_name,
                        warnings: artifact.map(|a| a.warnings).unwrap_or_default(),
                    });
                }
            }
            (JobState::Failed, _) => {
                status.progress = progress::TERMINAL;
                status.error = Some(match record.error {
                    Some(error) if error.code != ErrorCode::InfraError => error,
                    _ => ErrorRecord::infra(),
                });
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryArtifactStore, InMemoryJobStore};
    use blockforge_types::{Artifact, JobInput, JobKind, JobTransition};

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        artifacts: Arc<InMemoryArtifactStore>,
        live: LiveTable,
        service: StatusService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let artifacts = Arc::new(InMemoryArtifactStore::new());
        let live = LiveTable::new();
        let service = StatusService::new(store.clone(), artifacts.clone(), live.clone());
        Fixture {
            store,
            artifacts,
            live,
            service,
        }
    }

    async fn insert(f: &Fixture) -> JobId {
        let record = JobRecord::new(JobKind::CompileEvm, JobInput::new("A", "contract A {}"));
        let id = record.job_id.clone();
        f.store.insert(record).await.unwrap();
        id
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let f = fixture();
        assert_eq!(
            f.service.get_status(&JobId::from("missing")).await.unwrap(),
            StatusLookup::NotFound
        );
    }

    #[tokio::test]
    async fn queued_is_pending_at_zero() {
        let f = fixture();
        let id = insert(&f).await;
        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        assert_eq!(status.state, ExternalState::Pending);
        assert_eq!(status.progress, 0);
    }

    #[tokio::test]
    async fn live_progress_wins_while_running() {
        let f = fixture();
        let id = insert(&f).await;
        f.store.transition(&id, JobTransition::Start).await.unwrap();
        f.live.running(&id, progress::TOOLCHAIN_STARTED).await;

        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        assert_eq!(status.state, ExternalState::Processing);
        assert_eq!(status.progress, progress::TOOLCHAIN_STARTED);
    }

    #[tokio::test]
    async fn running_without_worker_reports_infra_failure() {
        let f = fixture();
        let id = insert(&f).await;
        f.store.transition(&id, JobTransition::Start).await.unwrap();

        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        assert_eq!(status.state, ExternalState::Failed);
        assert_eq!(status.error.unwrap().code, ErrorCode::InfraError);
    }

    /// Holds every record read for a while before returning it.
    struct SlowReads {
        inner: Arc<InMemoryJobStore>,
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl JobStore for SlowReads {
        async fn insert(&self, record: JobRecord) -> crate::error::StoreResult<()> {
            self.inner.insert(record).await
        }

        async fn get(&self, id: &JobId) -> crate::error::StoreResult<Option<JobRecord>> {
            let record = self.inner.get(id).await;
            tokio::time::sleep(self.delay).await;
            record
        }

        async fn list(&self) -> crate::error::StoreResult<Vec<JobRecord>> {
            self.inner.list().await
        }

        async fn transition(
            &self,
            id: &JobId,
            transition: JobTransition,
        ) -> crate::error::StoreResult<JobRecord> {
            self.inner.transition(id, transition).await
        }
    }

    #[tokio::test]
    async fn poll_racing_completion_never_reports_failure() {
        let f = fixture();
        let id = insert(&f).await;
        f.store.transition(&id, JobTransition::Start).await.unwrap();
        f.live.running(&id, progress::TOOLCHAIN_STARTED).await;

        let slow = StatusService::new(
            Arc::new(SlowReads {
                inner: f.store.clone(),
                delay: std::time::Duration::from_millis(100),
            }),
            f.artifacts.clone(),
            f.live.clone(),
        );
        let poll = {
            let id = id.clone();
            tokio::spawn(async move { slow.get_status(&id).await })
        };

        // Finish the way a worker does: terminal record first, then live.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let artifact = Artifact::evm("A", serde_json::json!([]), "6080", vec![]);
        let artifact_id = artifact.id.clone();
        f.artifacts.put(artifact).await.unwrap();
        f.store
            .transition(&id, JobTransition::Complete { artifact_id })
            .await
            .unwrap();
        f.live.finish(&id).await;

        let first = poll.await.unwrap().unwrap().found().unwrap();
        assert_eq!(first.state, ExternalState::Processing);
        assert!(first.error.is_none());

        let second = f.service.get_status(&id).await.unwrap().found().unwrap();
        assert_eq!(second.state, ExternalState::Completed);
    }

    #[tokio::test]
    async fn completed_includes_artifact_and_warnings() {
        let f = fixture();
        let id = insert(&f).await;
        let artifact = Artifact::evm("A", serde_json::json!([]), "6080", vec!["careful".into()]);
        let artifact_id = artifact.id.clone();
        f.artifacts.put(artifact).await.unwrap();
        f.store.transition(&id, JobTransition::Start).await.unwrap();
        f.store
            .transition(&id, JobTransition::Complete { artifact_id: artifact_id.clone() })
            .await
            .unwrap();

        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        assert_eq!(status.state, ExternalState::Completed);
        assert_eq!(status.progress, 100);
        let result = status.result.unwrap();
        assert_eq!(result.artifact_id, artifact_id);
        assert_eq!(result.warnings, vec!["careful".to_string()]);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn infra_details_are_not_exposed() {
        let f = fixture();
        let id = insert(&f).await;
        f.store.transition(&id, JobTransition::Start).await.unwrap();
        let error = ErrorRecord::new(ErrorCode::InfraError, "disk /var/lib/forge full");
        f.store.transition(&id, JobTransition::Fail { error }).await.unwrap();

        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        let error = status.error.unwrap();
        assert_eq!(error.message, ErrorRecord::INFRA_MESSAGE);
    }

    #[tokio::test]
    async fn toolchain_failures_keep_diagnostics() {
        let f = fixture();
        let id = insert(&f).await;
        f.store.transition(&id, JobTransition::Start).await.unwrap();
        let error = ErrorRecord::toolchain("solc reported 1 error(s)", "ParserError");
        f.store.transition(&id, JobTransition::Fail { error }).await.unwrap();

        let status = f.service.get_status(&id).await.unwrap().found().unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"]["code"], "TOOLCHAIN_ERROR");
        assert_eq!(json["error"]["diagnostics"], "ParserError");
        assert!(json.get("result").is_none());
    }
}
