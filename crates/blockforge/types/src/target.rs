//! Compilation targets.

use serde::{Deserialize, Serialize};

/// Language the source generator emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetLanguage {
    Solidity,
    #[serde(alias = "rust", alias = "soroban")]
    RustSoroban,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solidity => write!(f, "solidity"),
            Self::RustSoroban => write!(f, "rust-soroban"),
        }
    }
}

/// Kind of compilation job, i.e. which chain family the artifact is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Solidity → EVM bytecode + ABI.
    #[serde(alias = "evm")]
    CompileEvm,
    /// Soroban Rust → WASM.
    #[serde(alias = "stellar")]
    CompileStellar,
}

impl JobKind {
    /// Source language this job kind compiles.
    pub fn target_language(&self) -> TargetLanguage {
        match self {
            Self::CompileEvm => TargetLanguage::Solidity,
            Self::CompileStellar => TargetLanguage::RustSoroban,
        }
    }
}

impl From<TargetLanguage> for JobKind {
    fn from(target: TargetLanguage) -> Self {
        match target {
            TargetLanguage::Solidity => Self::CompileEvm,
            TargetLanguage::RustSoroban => Self::CompileStellar,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CompileEvm => write!(f, "compile-evm"),
            Self::CompileStellar => write!(f, "compile-stellar"),
        }
    }
}
