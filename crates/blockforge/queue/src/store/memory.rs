//! In-memory stores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use blockforge_types::{Artifact, ArtifactId, JobId, JobRecord, JobTransition};

use super::traits::{ArtifactStore, JobStore};
use crate::error::{StoreError, StoreResult};

/// In-memory job store for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, record: JobRecord) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            return Err(StoreError::Duplicate(record.job_id));
        }
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<JobRecord>> {
        let jobs = self.jobs.read().await;
        let mut records: Vec<JobRecord> = jobs.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn transition(&self, id: &JobId, transition: JobTransition) -> StoreResult<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::JobNotFound(id.clone()))?;
        record.apply(transition)?;
        Ok(record.clone())
    }
}

/// In-memory artifact store for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Arc<RwLock<HashMap<ArtifactId, Artifact>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, artifact: Artifact) -> StoreResult<()> {
        let mut artifacts = self.artifacts.write().await;
        artifacts.insert(artifact.id.clone(), artifact);
        Ok(())
    }

    async fn get(&self, id: &ArtifactId) -> StoreResult<Option<Artifact>> {
        let artifacts = self.artifacts.read().await;
        Ok(artifacts.get(id).cloned())
    }
}
