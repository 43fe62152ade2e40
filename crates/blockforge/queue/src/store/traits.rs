//! Store trait definitions

use async_trait::async_trait;
use blockforge_types::{Artifact, ArtifactId, JobId, JobRecord, JobState, JobTransition};

use crate::error::StoreResult;

/// Durable job records.
///
/// The store is the only state shared between workers; `transition` must be
/// atomic per job so that two workers can never move the same job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record
    async fn insert(&self, record: JobRecord) -> StoreResult<()>;

    /// Get a record by id
    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>>;

    /// List all records, oldest first
    async fn list(&self) -> StoreResult<Vec<JobRecord>>;

    /// Apply `transition` if the current state allows it, returning the
    /// updated record
    async fn transition(&self, id: &JobId, transition: JobTransition) -> StoreResult<JobRecord>;

    /// List records in `state`, oldest first
    async fn list_by_state(&self, state: JobState) -> StoreResult<Vec<JobRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.status == state)
            .collect())
    }
}

/// Compiled artifacts, addressed independently of jobs.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact under its id
    async fn put(&self, artifact: Artifact) -> StoreResult<()>;

    /// Get an artifact by id
    async fn get(&self, id: &ArtifactId) -> StoreResult<Option<Artifact>>;
}
