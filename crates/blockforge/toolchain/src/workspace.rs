//! Sandboxed workspace manager.
//!
//! Every compilation attempt gets its own directory under the configured
//! root. The directory is owned by a [`Workspace`] value: `cleanup()` removes
//! it explicitly, and dropping the value removes it on every other exit path
//! (error, panic, task cancellation).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::{WorkspaceError, WorkspaceResult};

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory under which job workspaces are allocated
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Name prefix of every workspace directory; used by the stale sweep
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            prefix: default_prefix(),
        }
    }
}

fn default_root() -> PathBuf {
    std::env::temp_dir().join("blockforge")
}

fn default_prefix() -> String {
    "forge-job-".to_string()
}

/// Allocates workspaces and sweeps leftovers.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    config: WorkspaceConfig,
}

impl WorkspaceManager {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// A fresh, not yet created workspace.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.config.root, &self.config.prefix)
    }

    /// Remove every directory under the root that carries the workspace
    /// prefix. Only safe while no worker is running.
    pub fn sweep_stale(&self) -> WorkspaceResult<usize> {
        let root = &self.config.root;
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(WorkspaceError::Resource {
                    path: root.clone(),
                    source: e,
                })
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_workspace = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&self.config.prefix))
                .unwrap_or(false);
            if !is_workspace || !path.is_dir() {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "Removed stale workspace");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale workspace");
                }
            }
        }
        Ok(removed)
    }
}

/// One job attempt's private directory.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    prefix: String,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            dir: None,
        }
    }

    /// Allocate a fresh unique directory. Calling it again while the
    /// directory exists returns the same path.
    pub fn create(&mut self) -> WorkspaceResult<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.path().to_path_buf());
        }

        std::fs::create_dir_all(&self.root).map_err(|e| WorkspaceError::Resource {
            path: self.root.clone(),
            source: e,
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempdir_in(&self.root)
            .map_err(|e| WorkspaceError::Resource {
                path: self.root.clone(),
                source: e,
            })?;

        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Workspace created");
        self.dir = Some(dir);
        Ok(path)
    }

    pub fn path(&self) -> WorkspaceResult<&Path> {
        self.dir
            .as_ref()
            .map(|d| d.path())
            .ok_or(WorkspaceError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.dir.is_some()
    }

    /// Remove the directory tree. A second call is a no-op.
    pub fn cleanup(&mut self) -> WorkspaceResult<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        let path = dir.path().to_path_buf();
        dir.close().map_err(|e| WorkspaceError::Resource {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "Workspace removed");
        Ok(())
    }
}
