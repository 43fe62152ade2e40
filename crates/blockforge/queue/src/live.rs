//! In-memory progress of jobs this process is handling.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use blockforge_types::{JobId, JobState};

/// Progress checkpoints.
pub mod progress {
    pub const QUEUED: u8 = 0;
    pub const WORKSPACE_READY: u8 = 10;
    pub const TOOLCHAIN_STARTED: u8 = 30;
    pub const OUTPUT_COLLECTED: u8 = 90;
    pub const TERMINAL: u8 = 100;
}

/// Live view of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveJob {
    pub state: JobState,
    pub progress: u8,
}

/// Shared table of live jobs.
#[derive(Debug, Clone, Default)]
pub struct LiveTable {
    jobs: Arc<RwLock<HashMap<JobId, LiveJob>>>,
}

impl LiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queued(&self, id: &JobId) {
        self.jobs.write().await.insert(
            id.clone(),
            LiveJob {
                state: JobState::Queued,
                progress: progress::QUEUED,
            },
        );
    }

    /// Move a job to `running` at `progress`. Progress never decreases.
    pub async fn running(&self, id: &JobId, progress: u8) {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.entry(id.clone()).or_insert(LiveJob {
            state: JobState::Running,
            progress,
        });
        entry.state = JobState::Running;
        entry.progress = entry.progress.max(progress);
    }

    /// Drop a job once its durable record is terminal.
    pub async fn finish(&self, id: &JobId) {
        self.jobs.write().await.remove(id);
    }

    pub async fn get(&self, id: &JobId) -> Option<LiveJob> {
        self.jobs.read().await.get(id).copied()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progress_is_monotonic() {
        let live = LiveTable::new();
        let id = JobId::new();
        live.queued(&id).await;
        assert_eq!(live.get(&id).await.unwrap().progress, progress::QUEUED);

        live.running(&id, progress::TOOLCHAIN_STARTED).await;
        live.running(&id, progress::WORKSPACE_READY).await;
        let job = live.get(&id).await.unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.progress, progress::TOOLCHAIN_STARTED);

        live.finish(&id).await;
        assert!(live.get(&id).await.is_none());
        assert!(live.is_empty().await);
    }
}
