//! Storage layer for job records and artifacts
//!
//! In-memory stores for development and tests, JSON-file stores for
//! single-node deployments.

mod file;
mod memory;
mod traits;

pub use file::{JsonFileArtifactStore, JsonFileJobStore};
pub use memory::{InMemoryArtifactStore, InMemoryJobStore};
pub use traits::{ArtifactStore, JobStore};
