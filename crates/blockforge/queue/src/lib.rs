//! # blockforge-queue
//!
//! Asynchronous compilation jobs.
//!
//! - [`JobQueue`]: accepts submissions, persists them, and runs them on a
//!   fixed pool of worker tasks, one [`Workspace`](blockforge_toolchain::Workspace)
//!   per job.
//! - [`JobStore`] / [`ArtifactStore`]: durable records, in memory or as JSON
//!   files. The job store is the only state shared between workers.
//! - [`StatusService`]: what polling clients see.
//!
//! Job states only move forward (`queued → running → completed | failed`);
//! failed jobs are never retried.

#![deny(unsafe_code)]

pub mod error;
pub mod live;
pub mod queue;
pub mod status;
pub mod store;
pub mod submission;

pub use error::{QueueError, QueueResult, StoreError, StoreResult};
pub use live::{progress, LiveJob, LiveTable};
pub use queue::{JobQueue, QueueConfig, RecoveryReport};
pub use status::{JobResult, JobStatus, StatusLookup, StatusService};
pub use store::{
    ArtifactStore, InMemoryArtifactStore, InMemoryJobStore, JobStore, JsonFileArtifactStore,
    JsonFileJobStore,
};
pub use submission::Submission;
