//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use blockforge_queue::{
    ArtifactStore, InMemoryArtifactStore, InMemoryJobStore, JobQueue, JobStore,
    JsonFileArtifactStore, JsonFileJobStore,
};
use blockforge_toolchain::{ToolchainSet, WorkspaceManager};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Blockforge daemon server
pub struct Server {
    config: DaemonConfig,
    queue: Arc<JobQueue>,
}

impl Server {
    /// Open storage and build the job queue. Workers start in [`Server::run`].
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let (store, artifacts) = open_storage(&config.storage).await?;

        let toolchains = ToolchainSet::from_config(&config.toolchain);
        let workspaces = WorkspaceManager::new(config.workspace.clone());

        let queue = JobQueue::new(config.queue.clone(), store, artifacts, toolchains, workspaces);

        Ok(Self { config, queue })
    }

    /// Run the server until a shutdown signal, then drain the workers
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let report = self.queue.start().await?;
        tracing::info!(
            workers = self.queue.worker_count(),
            orphaned = report.orphaned.len(),
            requeued = report.requeued.len(),
            workspaces_removed = report.workspaces_removed,
            "Worker pool started"
        );

        let state = AppState::new(self.queue.clone(), self.config.queue.max_source_bytes);
        let app = create_router(state, &self.config.server);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Blockforge daemon listening on {}", addr);
        tracing::info!(
            solc = %self.config.toolchain.solc_path.display(),
            cargo = %self.config.toolchain.cargo_path.display(),
            timeout_secs = self.config.toolchain.timeout_secs,
            "Toolchains configured"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Blockforge daemon shutting down, draining workers");

        self.queue.shutdown().await;

        Ok(())
    }
}

async fn open_storage(
    storage: &StorageConfig,
) -> DaemonResult<(Arc<dyn JobStore>, Arc<dyn ArtifactStore>)> {
    match storage {
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; jobs do not survive a restart");
            Ok((
                Arc::new(InMemoryJobStore::new()),
                Arc::new(InMemoryArtifactStore::new()),
            ))
        }
        StorageConfig::File { path } => {
            tracing::info!(path = %path.display(), "Using file storage");
            let store = JsonFileJobStore::open(path).await?;
            let artifacts = JsonFileArtifactStore::open(path).await?;
            Ok((Arc::new(store), Arc::new(artifacts)))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
