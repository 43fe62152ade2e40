//! External process execution with a wall-clock budget.
//!
//! On Unix the child is placed in its own process group, so a timeout can
//! take down everything it spawned (cargo → rustc → build scripts) with one
//! signal to the group.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::{ToolchainError, ToolchainResult};

/// A command to run inside a workspace.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs commands under a timeout.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Budget in whole seconds, rounded up so sub-second budgets never
    /// report as zero.
    pub fn timeout_secs(&self) -> u64 {
        let secs = self.timeout.as_secs();
        if self.timeout.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    /// Run `spec` to completion, or kill its process tree once the budget is
    /// spent and return [`ToolchainError::Timeout`].
    ///
    /// The budget covers both the process itself and draining its output
    /// pipes, so a backgrounded grandchild holding stdout open cannot stall
    /// the caller.
    pub async fn run(&self, mut spec: CommandSpec) -> ToolchainResult<ProcessOutput> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| ToolchainError::Spawn {
            program: spec.program_name(),
            source: e,
        })?;
        let pid = child.id();
        tracing::debug!(program = %spec.program_name(), pid = ?pid, "Process started");

        if let (Some(input), Some(mut pipe)) = (spec.stdin.take(), child.stdin.take()) {
            tokio::spawn(async move {
                // A compiler that exits early closes its stdin; nothing to do.
                let _ = pipe.write_all(&input).await;
                let _ = pipe.shutdown().await;
            });
        }

        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await?;
            let stdout = stdout.await.unwrap_or_default();
            let stderr = stderr.await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        match finished {
            Ok(Ok((status, stdout, stderr))) => Ok(ProcessOutput {
                exit_code: status.code(),
                stdout,
                stderr,
            }),
            Ok(Err(e)) => {
                kill_tree(pid).await;
                let _ = child.kill().await;
                Err(ToolchainError::Io(e))
            }
            Err(_) => {
                tracing::warn!(
                    program = %spec.program_name(),
                    pid = ?pid,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Process exceeded time limit, killing process group"
                );
                kill_tree(pid).await;
                let _ = child.kill().await;
                Err(ToolchainError::Timeout(self.timeout_secs()))
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// SIGKILL the whole process group led by `pid`.
async fn kill_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };

    #[cfg(unix)]
    {
        let status = Command::new("kill")
            .args(["-s", "KILL", "--"])
            .arg(format!("-{}", pid))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = status {
            tracing::warn!(pid, error = %e, "Failed to signal process group");
        }
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn runner(ms: u64) -> ProcessRunner {
        ProcessRunner::new(Duration::from_millis(ms))
    }

    fn sh(cwd: &Path, script: &str) -> CommandSpec {
        CommandSpec::new("sh", cwd).arg("-c").arg(script)
    }

    /// A pid counts as gone once it no longer exists or is a zombie.
    #[cfg(target_os = "linux")]
    fn process_gone(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
        }
    }

    #[test]
    fn timeout_secs_rounds_up() {
        assert_eq!(runner(500).timeout_secs(), 1);
        assert_eq!(runner(2_000).timeout_secs(), 2);
        assert_eq!(runner(2_001).timeout_secs(), 3);
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = runner(5_000)
            .run(sh(dir.path(), "echo out; echo err >&2; exit 3"))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn feeds_stdin_and_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "here").unwrap();
        let out = runner(5_000)
            .run(sh(dir.path(), "cat marker; cat").stdin("piped"))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "herepiped");
    }

    #[tokio::test]
    async fn env_is_passed() {
        let dir = tempfile::tempdir().unwrap();
        let out = runner(5_000)
            .run(sh(dir.path(), "printf %s \"$FORGE_TEST\"").env("FORGE_TEST", "yes"))
            .await
            .unwrap();
        assert_eq!(out.stdout, "yes");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(1_000)
            .run(CommandSpec::new("/nonexistent/forge-compiler", dir.path()))
            .await
            .unwrap_err();
        assert!(err.is_infra());
    }

    #[tokio::test]
    async fn timeout_kills_the_process_tree() {
        let dir = tempfile::tempdir().unwrap();
        let started = Instant::now();
        let err = runner(500)
            .run(sh(dir.path(), "sleep 30 & echo $! > bg.pid; wait"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolchainError::Timeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));

        #[cfg(target_os = "linux")]
        {
            let pid: u32 = std::fs::read_to_string(dir.path().join("bg.pid"))
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            let deadline = Instant::now() + Duration::from_secs(5);
            while !process_gone(pid) && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            assert!(process_gone(pid), "background sleep {pid} survived the timeout");
        }
    }
}
