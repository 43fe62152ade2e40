//! End-to-end tests for the job queue with scripted toolchains.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use blockforge_queue::{
    ArtifactStore, InMemoryArtifactStore, InMemoryJobStore, JobQueue, JobStatus, JobStore,
    QueueConfig, QueueError, StatusLookup, StatusService, StoreError, StoreResult, Submission,
};
use blockforge_toolchain::{
    Toolchain, ToolchainError, ToolchainOutput, ToolchainResult, ToolchainSet, WorkspaceConfig,
    WorkspaceManager,
};
use blockforge_types::{
    Artifact, Block, BlockKind, ErrorCode, ExternalState, JobId, JobInput, JobKind, JobRecord,
    JobState, JobTransition,
};

const PREFIX: &str = "forge-job-";

/// Succeeds unless the source asks otherwise (`FAIL`, `PANIC`, `SLOW`).
#[derive(Default)]
struct ScriptedToolchain {
    seen: Mutex<Vec<PathBuf>>,
    active: Mutex<HashSet<PathBuf>>,
    shared_workspace: Mutex<bool>,
}

#[async_trait]
impl Toolchain for ScriptedToolchain {
    fn kind(&self) -> JobKind {
        JobKind::CompileEvm
    }

    async fn run(&self, workspace: &Path, input: &JobInput) -> ToolchainResult<ToolchainOutput> {
        assert!(workspace.is_dir());
        self.seen.lock().unwrap().push(workspace.to_path_buf());
        if !self.active.lock().unwrap().insert(workspace.to_path_buf()) {
            *self.shared_workspace.lock().unwrap() = true;
        }
        std::fs::write(workspace.join("Contract.sol"), &input.source)?;

        if input.source.contains("SLOW") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.active.lock().unwrap().remove(workspace);

        if input.source.contains("PANIC") {
            panic!("scripted toolchain panic");
        }
        if input.source.contains("FAIL") {
            return Err(ToolchainError::failed(
                "solc reported 1 error(s)",
                "ParserError: Expected ';'",
            ));
        }

        Ok(ToolchainOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            artifact_paths: vec![],
            artifact: Artifact::evm(
                input.contract_name.clone(),
                serde_json::json!([]),
                "6080604052",
                vec!["scripted warning".to_string()],
            ),
        })
    }
}

struct Harness {
    _root: tempfile::TempDir,
    workspace_root: PathBuf,
    store: Arc<InMemoryJobStore>,
    queue: Arc<JobQueue>,
    status: StatusService,
}

fn harness_with(toolchain: Arc<dyn Toolchain>, store: Arc<InMemoryJobStore>, workers: usize) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let workspace_root = root.path().join("workspaces");
    let queue = JobQueue::new(
        QueueConfig {
            workers,
            ..QueueConfig::default()
        },
        store.clone(),
        Arc::new(InMemoryArtifactStore::new()),
        ToolchainSet::new(toolchain.clone(), toolchain),
        WorkspaceManager::new(WorkspaceConfig {
            root: workspace_root.clone(),
            prefix: PREFIX.to_string(),
        }),
    );
    let status = StatusService::for_queue(&queue);
    Harness {
        _root: root,
        workspace_root,
        store,
        queue,
        status,
    }
}

fn harness(toolchain: Arc<dyn Toolchain>, workers: usize) -> Harness {
    harness_with(toolchain, Arc::new(InMemoryJobStore::new()), workers)
}

fn leftover_workspaces(root: &Path) -> usize {
    match std::fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(PREFIX))
            .count(),
        Err(_) => 0,
    }
}

async fn wait_terminal(status: &StatusService, id: &JobId) -> JobStatus {
    for _ in 0..400 {
        if let StatusLookup::Found(s) = status.get_status(id).await.unwrap() {
            if matches!(s.state, ExternalState::Completed | ExternalState::Failed) {
                return s;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {id} did not reach a terminal state");
}

fn evm(name: &str, source: &str) -> Submission {
    Submission::source(JobKind::CompileEvm, name, source)
}

#[tokio::test]
async fn successful_job_completes_and_releases_workspace() {
    let toolchain = Arc::new(ScriptedToolchain::default());
    let h = harness(toolchain.clone(), 2);
    h.queue.start().await.unwrap();

    let id = h
        .queue
        .submit_request(evm("TestToken", "contract TestToken {}"))
        .await
        .unwrap();
    let status = wait_terminal(&h.status, &id).await;

    assert_eq!(status.state, ExternalState::Completed);
    assert_eq!(status.progress, 100);
    let result = status.result.unwrap();
    assert_eq!(result.warnings, vec!["scripted warning".to_string()]);

    let artifact = h.queue.artifacts().get(&result.artifact_id).await.unwrap().unwrap();
    assert_eq!(artifact.bytecode.as_deref(), Some("6080604052"));

    let seen = toolchain.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].exists());
    assert_eq!(leftover_workspaces(&h.workspace_root), 0);

    let record = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.status, JobState::Completed);
    assert!(record.started_at.is_some() && record.completed_at.is_some());
}

#[tokio::test]
async fn toolchain_failure_carries_diagnostics() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 1);
    h.queue.start().await.unwrap();

    let id = h
        .queue
        .submit_request(evm("Broken", "contract Broken { FAIL }"))
        .await
        .unwrap();
    let status = wait_terminal(&h.status, &id).await;

    assert_eq!(status.state, ExternalState::Failed);
    let error = status.error.unwrap();
    assert_eq!(error.code, ErrorCode::ToolchainError);
    assert_eq!(error.diagnostics.as_deref(), Some("ParserError: Expected ';'"));
    assert!(status.result.is_none());
    assert_eq!(leftover_workspaces(&h.workspace_root), 0);
}

#[tokio::test]
async fn panicking_toolchain_fails_job_as_infra_and_cleans_up() {
    let toolchain = Arc::new(ScriptedToolchain::default());
    let h = harness(toolchain.clone(), 1);
    h.queue.start().await.unwrap();

    let id = h
        .queue
        .submit_request(evm("Boom", "contract Boom { PANIC }"))
        .await
        .unwrap();
    let status = wait_terminal(&h.status, &id).await;

    assert_eq!(status.state, ExternalState::Failed);
    assert_eq!(status.error.unwrap().code, ErrorCode::InfraError);
    assert!(!toolchain.seen.lock().unwrap()[0].exists());

    // The worker survives the panic.
    let next = h
        .queue
        .submit_request(evm("Fine", "contract Fine {}"))
        .await
        .unwrap();
    assert_eq!(wait_terminal(&h.status, &next).await.state, ExternalState::Completed);
}

#[tokio::test]
async fn invalid_submissions_are_never_enqueued() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 1);

    let err = h.queue.submit_request(evm("Empty", "   ")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationEmptySource);

    let err = h
        .queue
        .submit_request(Submission::source(
            JobKind::CompileStellar,
            "NoSdk",
            "#[contractimpl] impl X {}",
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueueError::Validation { code: ErrorCode::ValidationMissingSdkImport, .. }
    ));

    let err = h
        .queue
        .submit_request(Submission::blocks(
            JobKind::CompileEvm,
            vec![Block::new("m", BlockKind::Mint)],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn block_submission_compiles_generated_source() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 1);
    h.queue.start().await.unwrap();

    let id = h
        .queue
        .submit_request(Submission::blocks(
            JobKind::CompileEvm,
            vec![Block::erc20("TestToken", "TST"), Block::new("m", BlockKind::Mint)],
        ))
        .await
        .unwrap();
    let status = wait_terminal(&h.status, &id).await;
    assert_eq!(status.result.unwrap().contract_name, "TestToken");

    let record = h.store.get(&id).await.unwrap().unwrap();
    assert!(record.input.source.contains("function mint("));
}

#[tokio::test]
async fn concurrent_jobs_never_share_a_workspace() {
    let toolchain = Arc::new(ScriptedToolchain::default());
    let h = harness(toolchain.clone(), 4);
    h.queue.start().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..16 {
        let id = h
            .queue
            .submit_request(evm(&format!("C{i}"), &format!("contract C{i} {{}} // SLOW")))
            .await
            .unwrap();
        ids.push(id);
    }
    for id in &ids {
        assert_eq!(wait_terminal(&h.status, id).await.state, ExternalState::Completed);
    }

    let seen = toolchain.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 16);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 16);
    assert!(!*toolchain.shared_workspace.lock().unwrap());
    assert_eq!(leftover_workspaces(&h.workspace_root), 0);
}

#[tokio::test]
async fn recovery_fails_orphans_and_requeues_pending() {
    let store = Arc::new(InMemoryJobStore::new());

    let orphan = JobRecord::new(JobKind::CompileEvm, JobInput::new("Orphan", "contract Orphan {}"));
    let orphan_id = orphan.job_id.clone();
    store.insert(orphan).await.unwrap();
    store.transition(&orphan_id, JobTransition::Start).await.unwrap();

    let pending = JobRecord::new(JobKind::CompileEvm, JobInput::new("Pending", "contract Pending {}"));
    let pending_id = pending.job_id.clone();
    store.insert(pending).await.unwrap();

    let h = harness_with(Arc::new(ScriptedToolchain::default()), store, 2);
    std::fs::create_dir_all(h.workspace_root.join(format!("{PREFIX}stale"))).unwrap();

    let report = h.queue.start().await.unwrap();
    assert_eq!(report.orphaned, vec![orphan_id.clone()]);
    assert_eq!(report.requeued, vec![pending_id.clone()]);
    assert_eq!(report.workspaces_removed, 1);

    let orphan_status = wait_terminal(&h.status, &orphan_id).await;
    assert_eq!(orphan_status.state, ExternalState::Failed);
    assert_eq!(orphan_status.error.unwrap().code, ErrorCode::InfraError);

    let pending_status = wait_terminal(&h.status, &pending_id).await;
    assert_eq!(pending_status.state, ExternalState::Completed);
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 1);
    h.queue.start().await.unwrap();
    assert!(matches!(h.queue.start().await, Err(QueueError::AlreadyStarted)));
}

#[tokio::test]
async fn shutdown_drains_queued_work() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 1);
    h.queue.start().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(
            h.queue
                .submit_request(evm(&format!("D{i}"), "contract D {} // SLOW"))
                .await
                .unwrap(),
        );
    }
    h.queue.shutdown().await;

    for id in &ids {
        let record = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobState::Completed);
    }
    assert!(matches!(
        h.queue.submit_request(evm("Late", "contract Late {}")).await,
        Err(QueueError::Closed)
    ));
}

#[tokio::test]
async fn full_channel_rejects_without_persisting() {
    let store = Arc::new(InMemoryJobStore::new());
    let root = tempfile::tempdir().unwrap();
    let toolchain: Arc<dyn Toolchain> = Arc::new(ScriptedToolchain::default());
    let queue = JobQueue::new(
        QueueConfig {
            workers: 1,
            channel_capacity: 1,
            ..QueueConfig::default()
        },
        store.clone(),
        Arc::new(InMemoryArtifactStore::new()),
        ToolchainSet::new(toolchain.clone(), toolchain),
        WorkspaceManager::new(WorkspaceConfig {
            root: root.path().to_path_buf(),
            prefix: PREFIX.to_string(),
        }),
    );

    // Not started: the single slot fills up.
    queue.submit_request(evm("A", "contract A {}")).await.unwrap();
    assert!(matches!(
        queue.submit_request(evm("B", "contract B {}")).await,
        Err(QueueError::Full)
    ));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

fn rank(state: ExternalState) -> u8 {
    match state {
        ExternalState::Pending => 0,
        ExternalState::Processing => 1,
        ExternalState::Completed | ExternalState::Failed => 2,
    }
}

#[tokio::test]
async fn polled_states_only_move_forward() {
    let h = harness(Arc::new(ScriptedToolchain::default()), 2);
    h.queue.start().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..8 {
        let source = if i % 3 == 0 {
            format!("contract P{i} {{}} // SLOW FAIL")
        } else {
            format!("contract P{i} {{}} // SLOW")
        };
        ids.push(h.queue.submit_request(evm(&format!("P{i}"), &source)).await.unwrap());
    }

    let pollers: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let status = h.status.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                let mut terminal_polls = 0;
                while terminal_polls < 5 {
                    let state = status.get_status(&id).await.unwrap().found().unwrap().state;
                    if rank(state) == 2 {
                        terminal_polls += 1;
                    }
                    seen.push(state);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                seen
            })
        })
        .collect();

    for poller in pollers {
        let seen = poller.await.unwrap();
        for pair in seen.windows(2) {
            assert!(rank(pair[0]) <= rank(pair[1]), "state went backwards: {seen:?}");
        }
        let terminal: HashSet<_> = seen.iter().filter(|s| rank(**s) == 2).collect();
        assert_eq!(terminal.len(), 1, "more than one terminal state: {seen:?}");
    }
}

/// Fails the first `failures` attempts to record a job start.
struct FlakyStart {
    inner: InMemoryJobStore,
    failures: Mutex<usize>,
}

#[async_trait]
impl JobStore for FlakyStart {
    async fn insert(&self, record: JobRecord) -> StoreResult<()> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> StoreResult<Vec<JobRecord>> {
        self.inner.list().await
    }

    async fn transition(&self, id: &JobId, transition: JobTransition) -> StoreResult<JobRecord> {
        if transition == JobTransition::Start {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::Io(std::io::Error::other("store unavailable")));
            }
        }
        self.inner.transition(id, transition).await
    }
}

#[tokio::test]
async fn unrecorded_start_is_retried_until_terminal() {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(FlakyStart {
        inner: InMemoryJobStore::new(),
        failures: Mutex::new(2),
    });
    let toolchain: Arc<dyn Toolchain> = Arc::new(ScriptedToolchain::default());
    let queue = JobQueue::new(
        QueueConfig {
            workers: 1,
            start_retry_ms: 10,
            ..QueueConfig::default()
        },
        store.clone(),
        Arc::new(InMemoryArtifactStore::new()),
        ToolchainSet::new(toolchain.clone(), toolchain),
        WorkspaceManager::new(WorkspaceConfig {
            root: root.path().to_path_buf(),
            prefix: PREFIX.to_string(),
        }),
    );
    let status = StatusService::for_queue(&queue);
    queue.start().await.unwrap();

    let id = queue.submit_request(evm("Retry", "contract Retry {}")).await.unwrap();
    let polled = status.get_status(&id).await.unwrap().found().unwrap();
    assert_eq!(polled.state, ExternalState::Pending);

    assert_eq!(wait_terminal(&status, &id).await.state, ExternalState::Completed);
    assert_eq!(*store.failures.lock().unwrap(), 0);
    queue.shutdown().await;
}

#[cfg(unix)]
mod real_process {
    use super::*;
    use blockforge_toolchain::{ProcessRunner, SolcToolchain};
    use std::os::unix::fs::PermissionsExt;

    #[cfg(target_os = "linux")]
    fn process_gone(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
        }
    }

    #[tokio::test]
    async fn timeout_fails_job_and_leaves_no_process() {
        let bin = tempfile::tempdir().unwrap();
        let pid_file = bin.path().join("solc.pid");
        let script = bin.path().join("slow-solc");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let solc: Arc<dyn Toolchain> = Arc::new(SolcToolchain::new(
            &script,
            200,
            ProcessRunner::new(Duration::from_secs(1)),
        ));
        let h = harness(solc, 1);
        h.queue.start().await.unwrap();

        let id = h
            .queue
            .submit_request(evm("Slow", "contract Slow {}"))
            .await
            .unwrap();
        let status = wait_terminal(&h.status, &id).await;

        assert_eq!(status.state, ExternalState::Failed);
        let error = status.error.unwrap();
        assert_eq!(error.code, ErrorCode::Timeout);
        assert!(error.diagnostics.is_none());
        assert_eq!(leftover_workspaces(&h.workspace_root), 0);

        #[cfg(target_os = "linux")]
        {
            let pid: u32 = std::fs::read_to_string(&pid_file)
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            for _ in 0..100 {
                if process_gone(pid) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            assert!(process_gone(pid), "compiler process {pid} still running");
        }
    }
}
