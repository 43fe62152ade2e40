//! # blockforge-toolchain
//!
//! Runs external compilers against submitted contract source, one private
//! directory per attempt.
//!
//! - [`Workspace`] / [`WorkspaceManager`]: per-job directories, removed on
//!   every exit path, plus the crash-recovery sweep.
//! - [`ProcessRunner`]: child processes with a wall-clock budget; on expiry
//!   the whole process group is killed.
//! - [`SolcToolchain`]: Solidity → ABI + EVM bytecode.
//! - [`SorobanToolchain`]: Soroban Rust → WASM.
//!
//! Binary paths and limits come from [`ToolchainConfig`] and are injected at
//! construction.

#![deny(unsafe_code)]

pub mod error;
pub mod process;
pub mod solc;
pub mod soroban;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use blockforge_types::{Artifact, JobInput, JobKind};

pub use error::{ToolchainError, ToolchainResult, WorkspaceError, WorkspaceResult};
pub use process::{CommandSpec, ProcessOutput, ProcessRunner};
pub use solc::{parse_standard_json, SolcOutput, SolcToolchain};
pub use soroban::{package_name, SorobanToolchain};
pub use workspace::{Workspace, WorkspaceConfig, WorkspaceManager};

/// Everything a successful compiler run produced.
#[derive(Debug, Clone)]
pub struct ToolchainOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Files left in the workspace; gone once the workspace is cleaned up.
    pub artifact_paths: Vec<PathBuf>,
    /// Parsed, self-contained result.
    pub artifact: Artifact,
}

/// An external compiler for one job kind.
#[async_trait]
pub trait Toolchain: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Compile `input` inside `workspace`, which the caller owns and cleans.
    async fn run(&self, workspace: &Path, input: &JobInput) -> ToolchainResult<ToolchainOutput>;
}

/// Toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Path or name of the `solc` binary
    #[serde(default = "default_solc_path")]
    pub solc_path: PathBuf,

    /// Path or name of the `cargo` binary
    #[serde(default = "default_cargo_path")]
    pub cargo_path: PathBuf,

    /// Wall-clock budget per compiler invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optimizer runs when a job does not specify any
    #[serde(default = "default_optimizer_runs")]
    pub default_optimizer_runs: u32,

    /// Rust target triple for Soroban builds
    #[serde(default = "default_wasm_target")]
    pub wasm_target: String,

    /// `soroban-sdk` version written into scaffolded manifests
    #[serde(default = "default_soroban_sdk_version")]
    pub soroban_sdk_version: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            solc_path: default_solc_path(),
            cargo_path: default_cargo_path(),
            timeout_secs: default_timeout_secs(),
            default_optimizer_runs: default_optimizer_runs(),
            wasm_target: default_wasm_target(),
            soroban_sdk_version: default_soroban_sdk_version(),
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_solc_path() -> PathBuf {
    PathBuf::from("solc")
}

fn default_cargo_path() -> PathBuf {
    PathBuf::from("cargo")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_optimizer_runs() -> u32 {
    200
}

fn default_wasm_target() -> String {
    "wasm32-unknown-unknown".to_string()
}

fn default_soroban_sdk_version() -> String {
    "22.0.0".to_string()
}

/// One toolchain per job kind.
#[derive(Clone)]
pub struct ToolchainSet {
    evm: Arc<dyn Toolchain>,
    stellar: Arc<dyn Toolchain>,
}

impl ToolchainSet {
    pub fn new(evm: Arc<dyn Toolchain>, stellar: Arc<dyn Toolchain>) -> Self {
        Self { evm, stellar }
    }

    /// The real compilers described by `config`.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        let runner = ProcessRunner::new(config.timeout());
        Self {
            evm: Arc::new(SolcToolchain::new(
                &config.solc_path,
                config.default_optimizer_runs,
                runner,
            )),
            stellar: Arc::new(SorobanToolchain::new(
                &config.cargo_path,
                &config.wasm_target,
                &config.soroban_sdk_version,
                runner,
            )),
        }
    }

    pub fn for_kind(&self, kind: JobKind) -> &Arc<dyn Toolchain> {
        match kind {
            JobKind::CompileEvm => &self.evm,
            JobKind::CompileStellar => &self.stellar,
        }
    }
}

impl std::fmt::Debug for ToolchainSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainSet")
            .field("evm", &self.evm.kind())
            .field("stellar", &self.stellar.kind())
            .finish()
    }
}

/// File-system safe stem for a contract name.
pub(crate) fn file_stem(contract_name: &str) -> String {
    let stem: String = contract_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "Contract".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config: ToolchainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_optimizer_runs, 200);
        assert_eq!(config.wasm_target, "wasm32-unknown-unknown");
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn set_routes_by_kind() {
        let set = ToolchainSet::from_config(&ToolchainConfig::default());
        assert_eq!(set.for_kind(JobKind::CompileEvm).kind(), JobKind::CompileEvm);
        assert_eq!(
            set.for_kind(JobKind::CompileStellar).kind(),
            JobKind::CompileStellar
        );
    }

    #[test]
    fn file_stems() {
        assert_eq!(file_stem("TestToken"), "TestToken");
        assert_eq!(file_stem("My Token!"), "My_Token_");
        assert_eq!(file_stem(""), "Contract");
    }
}
