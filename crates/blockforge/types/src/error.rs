//! Stable error vocabulary shared by the validator, the queue and the API.

use serde::{Deserialize, Serialize};

/// Machine-readable failure code. Serialized as SCREAMING_SNAKE_CASE and
/// never renamed once published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing submission fields.
    InvalidInput,
    /// Source is empty or whitespace only.
    ValidationEmptySource,
    /// Source exceeds the byte ceiling.
    ValidationTooLarge,
    /// Soroban source lacks the SDK import.
    ValidationMissingSdkImport,
    /// Soroban source lacks the contract entry marker.
    ValidationMissingContractMarker,
    /// Source carries markers of the other chain family.
    ValidationCrossDomain,
    /// The compiler ran and reported failure.
    ToolchainError,
    /// The compiler exceeded its wall-clock budget.
    Timeout,
    /// Workspace or filesystem allocation failed.
    ResourceError,
    /// Queue/store failure, or a job orphaned by a restart.
    InfraError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ValidationEmptySource => "VALIDATION_EMPTY_SOURCE",
            Self::ValidationTooLarge => "VALIDATION_TOO_LARGE",
            Self::ValidationMissingSdkImport => "VALIDATION_MISSING_SDK_IMPORT",
            Self::ValidationMissingContractMarker => "VALIDATION_MISSING_CONTRACT_MARKER",
            Self::ValidationCrossDomain => "VALIDATION_CROSS_DOMAIN",
            Self::ToolchainError => "TOOLCHAIN_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ResourceError => "RESOURCE_ERROR",
            Self::InfraError => "INFRA_ERROR",
        }
    }

    /// Whether the code belongs to the static source gate.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationEmptySource
                | Self::ValidationTooLarge
                | Self::ValidationMissingSdkImport
                | Self::ValidationMissingContractMarker
                | Self::ValidationCrossDomain
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error of a failed job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    /// Short human-readable message.
    pub message: String,
    /// Captured compiler output; only present for `TOOLCHAIN_ERROR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl ErrorRecord {
    /// Message shown to clients for infra failures.
    pub const INFRA_MESSAGE: &'static str = "internal error while processing job";

    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            diagnostics: None,
        }
    }

    /// Compiler failure carrying its captured stderr.
    pub fn toolchain(message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        Self {
            code: ErrorCode::ToolchainError,
            message: message.into(),
            diagnostics: (!diagnostics.is_empty()).then_some(diagnostics),
        }
    }

    pub fn timeout(limit_secs: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("compilation exceeded {}s time limit", limit_secs),
        )
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceError, message)
    }

    /// Infra failure; the detailed cause is logged, not stored.
    pub fn infra() -> Self {
        Self::new(ErrorCode::InfraError, Self::INFRA_MESSAGE)
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
