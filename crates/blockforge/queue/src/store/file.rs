//! JSON-file stores.
//!
//! One file per record under a data directory:
//!
//! ```text
//! <dir>/jobs/<job-id>.json
//! <dir>/artifacts/<artifact-id>.json
//! ```
//!
//! Writes are atomic (write to `.tmp`, then rename). Job records are also
//! cached in memory; the cache lock serializes transitions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use blockforge_types::{Artifact, ArtifactId, JobId, JobRecord, JobTransition};

use super::traits::{ArtifactStore, JobStore};
use crate::error::{StoreError, StoreResult};

async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Ids come from clients on the read path; only plain uuid-like names map to
/// files.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Job store persisted as JSON files
#[derive(Debug)]
pub struct JsonFileJobStore {
    dir: PathBuf,
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JsonFileJobStore {
    /// Open (or create) the store under `data_dir`, loading every record.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = data_dir.as_ref().join("jobs");
        tokio::fs::create_dir_all(&dir).await?;

        let mut jobs = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<JobRecord>(&path).await {
                Ok(Some(record)) => {
                    jobs.insert(record.job_id.clone(), record);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable job record");
                }
            }
        }
        tracing::info!(dir = %dir.display(), jobs = jobs.len(), "Job store opened");

        Ok(Self {
            dir,
            jobs: RwLock::new(jobs),
        })
    }

    fn record_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn insert(&self, record: JobRecord) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            return Err(StoreError::Duplicate(record.job_id));
        }
        write_atomic(&self.record_path(&record.job_id), &record).await?;
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
        let current = jobs
            .get(id)
            .ok_or_else(|| StoreError::JobNotFound(id.clone()))?;

        let mut next = current.clone();
        next.apply(transition)?;
        write_atomic(&self.record_path(id), &next).await?;
        jobs.insert(id.clone(), next.clone());
        Ok(next)
    }
}

/// Artifact store persisted as JSON files
#[derive(Debug)]
pub struct JsonFileArtifactStore {
    dir: PathBuf,
}

impl JsonFileArtifactStore {
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = data_dir.as_ref().join("artifacts");
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl ArtifactStore for JsonFileArtifactStore {
    async fn put(&self, artifact: Artifact) -> StoreResult<()> {
        let path = self.dir.join(format!("{}.json", artifact.id));
        write_atomic(&path, &artifact).await
    }

    async fn get(&self, id: &ArtifactId) -> StoreResult<Option<Artifact>> {
        if !is_safe_id(id.as_str()) {
            return Ok(None);
        }
        read_json(&self.dir.join(format!("{}.json", id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockforge_types::{JobInput, JobKind, JobState};

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let rec = JobRecord::new(JobKind::CompileStellar, JobInput::new("T", "src"));
        let id = rec.job_id.clone();

        {
            let store = JsonFileJobStore::open(dir.path()).await.unwrap();
            store.insert(rec).await.unwrap();
            store.transition(&id, JobTransition::Start).await.unwrap();
        }

        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobState::Running);
        assert_eq!(loaded.input.source, "src");
        assert!(!dir.path().join("jobs").join(format!("{id}.tmp")).exists());
    }

    #[tokio::test]
    async fn rejected_transition_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        let rec = JobRecord::new(JobKind::CompileEvm, JobInput::new("A", "x"));
        let id = rec.job_id.clone();
        store.insert(rec).await.unwrap();

        let completed = JobTransition::Complete {
            artifact_id: ArtifactId::new(),
        };
        assert!(store.transition(&id, completed).await.is_err());

        let reopened = JsonFileJobStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get(&id).await.unwrap().unwrap().status,
            JobState::Queued
        );
    }

    #[tokio::test]
    async fn corrupt_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("jobs")).unwrap();
        std::fs::write(dir.path().join("jobs/broken.json"), b"{").unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn artifacts_persist_and_reject_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileArtifactStore::open(dir.path()).await.unwrap();
        let artifact = Artifact::evm("A", serde_json::json!([]), "6080", vec!["w".into()]);
        let id = artifact.id.clone();
        store.put(artifact.clone()).await.unwrap();

        let reopened = JsonFileArtifactStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get(&id).await.unwrap(), Some(artifact));
        assert!(reopened
            .get(&ArtifactId::from("../jobs/x"))
            .await
            .unwrap()
            .is_none());
    }
}
