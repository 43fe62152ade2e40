//! Soroban Rust → WASM via `cargo build`.
//!
//! The workspace becomes a throwaway single-crate package:
//!
//! ```text
//! <workspace>/
//!   Cargo.toml          cdylib, soroban-sdk, size-optimized release profile
//!   src/lib.rs          submitted source
//!   target/<triple>/release/<crate_name>.wasm
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use blockforge_types::{Artifact, JobInput, JobKind};

use crate::error::{ToolchainError, ToolchainResult};
use crate::process::{CommandSpec, ProcessRunner};
use crate::{Toolchain, ToolchainOutput};

/// Invokes `cargo` to build a Soroban contract.
#[derive(Debug, Clone)]
pub struct SorobanToolchain {
    cargo: PathBuf,
    target_triple: String,
    sdk_version: String,
    runner: ProcessRunner,
}

impl SorobanToolchain {
    pub fn new(
        cargo: impl Into<PathBuf>,
        target_triple: impl Into<String>,
        sdk_version: impl Into<String>,
        runner: ProcessRunner,
    ) -> Self {
        Self {
            cargo: cargo.into(),
            target_triple: target_triple.into(),
            sdk_version: sdk_version.into(),
            runner,
        }
    }

    /// Package manifest for `package`.
    pub fn manifest(&self, package: &str) -> String {
        format!(
            r#"[package]
name = "{package}"
version = "0.1.0"
edition = "2021"
publish = false

[lib]
crate-type = ["cdylib"]
path = "src/lib.rs"

[dependencies]
soroban-sdk = "{sdk}"

[profile.release]
opt-level = "z"
overflow-checks = true
debug = 0
strip = "symbols"
debug-assertions = false
panic = "abort"
codegen-units = 1
lto = true

[workspace]
"#,
            package = package,
            sdk = self.sdk_version,
        )
    }

    /// Where cargo leaves the binary for `package`.
    pub fn wasm_path(&self, workspace: &Path, package: &str) -> PathBuf {
        workspace
            .join("target")
            .join(&self.target_triple)
            .join("release")
            .join(format!("{}.wasm", package.replace('-', "_")))
    }
}

/// Cargo package name for a contract name: lowercase ASCII alphanumerics
/// joined by single hyphens.
pub fn package_name(contract_name: &str) -> String {
    let mut name = String::with_capacity(contract_name.len());
    for ch in contract_name.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
        } else if !name.is_empty() && !name.ends_with('-') {
            name.push('-');
        }
    }
    while name.ends_with('-') {
        name.pop();
    }
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "contract-");
        if name.ends_with('-') {
            name.pop();
        }
    }
    name
}

/// `warning:` lines from cargo stderr, minus the per-crate summary.
fn cargo_warnings(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("warning:"))
        // cargo's per-package tally: "warning: `pkg` (lib) generated 2 warnings"
        .filter(|line| !line.contains(") generated "))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Toolchain for SorobanToolchain {
    fn kind(&self) -> JobKind {
        JobKind::CompileStellar
    }

    async fn run(&self, workspace: &Path, input: &JobInput) -> ToolchainResult<ToolchainOutput> {
        let package = package_name(&input.contract_name);
        tokio::fs::create_dir_all(workspace.join("src")).await?;
        tokio::fs::write(workspace.join("Cargo.toml"), self.manifest(&package)).await?;
        tokio::fs::write(workspace.join("src").join("lib.rs"), &input.source).await?;

        let target_dir = workspace.join("target");
        tracing::debug!(contract = %input.contract_name, package = %package, "Invoking cargo build");
        let output = self
            .runner
            .run(
                CommandSpec::new(&self.cargo, workspace)
                    .args(["build", "--release", "--target"])
                    .arg(&self.target_triple)
                    .arg("--target-dir")
                    .arg(target_dir.as_os_str())
                    .env("CARGO_TERM_COLOR", "never"),
            )
            .await?;

        if !output.success() {
            return Err(ToolchainError::failed(
                format!("cargo build exited with status {:?}", output.exit_code),
                output.stderr,
            ));
        }

        let wasm_path = self.wasm_path(workspace, &package);
        let wasm = match tokio::fs::read(&wasm_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolchainError::failed(
                    format!("build produced no binary at {}", wasm_path.display()),
                    output.stderr,
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let warnings = cargo_warnings(&output.stderr);
        Ok(ToolchainOutput {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            artifact_paths: vec![wasm_path],
            artifact: Artifact::wasm(input.contract_name.clone(), wasm, warnings),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn toolchain(cargo: impl Into<PathBuf>) -> SorobanToolchain {
        SorobanToolchain::new(
            cargo,
            "wasm32-unknown-unknown",
            "22.0.0",
            ProcessRunner::new(Duration::from_secs(10)),
        )
    }

    #[test]
    fn package_names_are_normalized() {
        assert_eq!(package_name("TestToken"), "testtoken");
        assert_eq!(package_name("My Token!"), "my-token");
        assert_eq!(package_name("my_cool--token"), "my-cool-token");
        assert_eq!(package_name("42 Club"), "contract-42-club");
        assert_eq!(package_name("!!!"), "contract");
    }

    #[test]
    fn manifest_is_size_optimized_cdylib() {
        let manifest = toolchain("cargo").manifest("my-token");
        assert!(manifest.contains("name = \"my-token\""));
        assert!(manifest.contains("crate-type = [\"cdylib\"]"));
        assert!(manifest.contains("soroban-sdk = \"22.0.0\""));
        assert!(manifest.contains("opt-level = \"z\""));
        assert!(manifest.contains("lto = true"));
        assert!(manifest.contains("codegen-units = 1"));
        assert!(manifest.trim_end().ends_with("[workspace]"));
    }

    #[test]
    fn wasm_path_uses_underscored_crate_name() {
        let path = toolchain("cargo").wasm_path(Path::new("/ws"), "my-token");
        assert_eq!(
            path,
            Path::new("/ws/target/wasm32-unknown-unknown/release/my_token.wasm")
        );
    }

    #[test]
    fn warning_summary_lines_are_dropped() {
        let stderr = "warning: unused variable: `x`\n  --> src/lib.rs:3:9\nwarning: `my-token` (lib) generated 1 warning\n   Finished release";
        assert_eq!(cargo_warnings(stderr), vec!["warning: unused variable: `x`".to_string()]);
    }

    #[test]
    fn diagnostics_mentioning_generated_are_kept() {
        let stderr = "warning: unused import in generated code
warning: `t` (lib) generated 2 warnings";
        assert_eq!(
            cargo_warnings(stderr),
            vec!["warning: unused import in generated code".to_string()]
        );
    }

    #[cfg(unix)]
    fn fake_cargo(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("fake-cargo");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn collects_the_wasm_binary() {
        let bin_dir = tempfile::tempdir().unwrap();
        let cargo = fake_cargo(
            bin_dir.path(),
            "test -f Cargo.toml || exit 9\n\
             mkdir -p target/wasm32-unknown-unknown/release\n\
             printf '\\000asm' > target/wasm32-unknown-unknown/release/my_token.wasm",
        );

        let ws = tempfile::tempdir().unwrap();
        let out = toolchain(cargo)
            .run(ws.path(), &JobInput::new("My Token", "#![no_std]"))
            .await
            .unwrap();

        assert_eq!(out.artifact.wasm_bytes.as_deref(), Some(&b"\0asm"[..]));
        assert_eq!(out.artifact.kind, JobKind::CompileStellar);
        assert_eq!(
            std::fs::read_to_string(ws.path().join("src/lib.rs")).unwrap(),
            "#![no_std]"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_is_a_toolchain_failure() {
        let bin_dir = tempfile::tempdir().unwrap();
        let cargo = fake_cargo(bin_dir.path(), "exit 0");
        let ws = tempfile::tempdir().unwrap();
        let err = toolchain(cargo)
            .run(ws.path(), &JobInput::new("Token", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Failed { .. }));
    }
}
