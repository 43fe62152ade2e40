//! Application state for API handlers

use std::sync::Arc;

use blockforge_codegen::SourceValidator;
use blockforge_queue::{JobQueue, StatusService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Job queue and worker pool
    pub queue: Arc<JobQueue>,

    /// Status projection over the queue's stores
    pub status: StatusService,

    /// Gate used by the preview endpoint; same ceiling as the queue's
    pub validator: SourceValidator,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(queue: Arc<JobQueue>, max_source_bytes: usize) -> Self {
        Self {
            status: StatusService::for_queue(&queue),
            validator: SourceValidator::new(max_source_bytes),
            queue,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Uptime as `1h 2m`, `3m 4s` or `5s`
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds().max(0);
        match secs {
            0..=59 => format!("{}s", secs),
            60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
            _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        }
    }
}
