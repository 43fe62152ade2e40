//! Solidity → EVM via `solc --standard-json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use blockforge_types::{Artifact, JobInput, JobKind};

use crate::error::{ToolchainError, ToolchainResult};
use crate::process::{CommandSpec, ProcessRunner};
use crate::{file_stem, Toolchain, ToolchainOutput};

/// Invokes a `solc` binary.
#[derive(Debug, Clone)]
pub struct SolcToolchain {
    binary: PathBuf,
    default_optimizer_runs: u32,
    runner: ProcessRunner,
}

impl SolcToolchain {
    pub fn new(binary: impl Into<PathBuf>, default_optimizer_runs: u32, runner: ProcessRunner) -> Self {
        Self {
            binary: binary.into(),
            default_optimizer_runs,
            runner,
        }
    }

    /// Standard-JSON compiler input for one source file.
    pub fn standard_json_input(file_name: &str, source: &str, optimizer_runs: u32) -> Value {
        let mut sources = serde_json::Map::new();
        sources.insert(file_name.to_string(), json!({ "content": source }));

        json!({
            "language": "Solidity",
            "sources": sources,
            "settings": {
                "optimizer": { "enabled": true, "runs": optimizer_runs },
                "outputSelection": {
                    "*": { "*": ["abi", "evm.bytecode.object"] }
                }
            }
        })
    }
}

/// ABI, bytecode and warnings extracted from solc output.
#[derive(Debug, Clone, PartialEq)]
pub struct SolcOutput {
    pub abi: Value,
    pub bytecode: String,
    pub warnings: Vec<String>,
}

/// Parse `solc --standard-json` output.
///
/// Picks the contract named `contract_name` in `file_name`, falling back to
/// the first contract with non-empty bytecode (user-supplied sources may
/// name their contract differently).
pub fn parse_standard_json(
    stdout: &str,
    file_name: &str,
    contract_name: &str,
) -> ToolchainResult<SolcOutput> {
    let output: Value =
        serde_json::from_str(stdout).map_err(|e| ToolchainError::Parse(e.to_string()))?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for diag in output["errors"].as_array().into_iter().flatten() {
        let text = diag["formattedMessage"]
            .as_str()
            .or_else(|| diag["message"].as_str())
            .unwrap_or_default()
            .trim_end()
            .to_string();
        match diag["severity"].as_str() {
            Some("error") => errors.push(text),
            _ => warnings.push(text),
        }
    }
    if !errors.is_empty() {
        return Err(ToolchainError::failed(
            format!("solc reported {} error(s)", errors.len()),
            errors.join("\n"),
        ));
    }

    let contracts = output["contracts"][file_name]
        .as_object()
        .ok_or_else(|| ToolchainError::Parse(format!("no contracts for {}", file_name)))?;

    let bytecode_of = |c: &Value| {
        c["evm"]["bytecode"]["object"]
            .as_str()
            .filter(|code| !code.is_empty())
            .map(str::to_string)
    };

    let (abi, bytecode) = contracts
        .get(contract_name)
        .and_then(|c| bytecode_of(c).map(|code| (c["abi"].clone(), code)))
        .or_else(|| {
            contracts
                .values()
                .find_map(|c| bytecode_of(c).map(|code| (c["abi"].clone(), code)))
        })
        .ok_or_else(|| {
            ToolchainError::failed(
                format!("no deployable contract named {} in output", contract_name),
                String::new(),
            )
        })?;

    Ok(SolcOutput {
        abi,
        bytecode,
        warnings,
    })
}

#[async_trait]
impl Toolchain for SolcToolchain {
    fn kind(&self) -> JobKind {
        JobKind::CompileEvm
    }

    async fn run(&self, workspace: &Path, input: &JobInput) -> ToolchainResult<ToolchainOutput> {
        let stem = file_stem(&input.contract_name);
        let file_name = format!("{}.sol", stem);
        tokio::fs::write(workspace.join(&file_name), &input.source).await?;

        let runs = input.optimizer_runs.unwrap_or(self.default_optimizer_runs);
        let request = Self::standard_json_input(&file_name, &input.source, runs);
        let stdin = serde_json::to_vec(&request).map_err(|e| ToolchainError::Parse(e.to_string()))?;

        tracing::debug!(contract = %input.contract_name, optimizer_runs = runs, "Invoking solc");
        let output = self
            .runner
            .run(
                CommandSpec::new(&self.binary, workspace)
                    .arg("--standard-json")
                    .stdin(stdin),
            )
            .await?;

        if !output.success() {
            return Err(ToolchainError::failed(
                format!("solc exited with status {:?}", output.exit_code),
                output.stderr,
            ));
        }

        let parsed = parse_standard_json(&output.stdout, &file_name, &input.contract_name)?;

        let out_dir = workspace.join("out");
        tokio::fs::create_dir_all(&out_dir).await?;
        let abi_path = out_dir.join(format!("{}.abi.json", stem));
        let bin_path = out_dir.join(format!("{}.bin", stem));
        tokio::fs::write(&abi_path, parsed.abi.to_string()).await?;
        tokio::fs::write(&bin_path, &parsed.bytecode).await?;

        Ok(ToolchainOutput {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            artifact_paths: vec![abi_path, bin_path],
            artifact: Artifact::evm(
                input.contract_name.clone(),
                parsed.abi,
                parsed.bytecode,
                parsed.warnings,
            ),
        })
    }
}
