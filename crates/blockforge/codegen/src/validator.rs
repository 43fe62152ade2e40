//! Static source gate run before any toolchain invocation.
//!
//! Substring checks only. A Soroban source that happens to spell the SDK
//! import differently (e.g. through a re-export) is rejected.

use serde::{Deserialize, Serialize};

use blockforge_types::{ErrorCode, TargetLanguage};

/// Byte ceiling for submitted source (1 MiB).
pub const MAX_SOURCE_BYTES: usize = 1_048_576;

const SDK_IMPORT: &str = "soroban_sdk";
const CONTRACT_MARKER: &str = "#[contractimpl]";

const EVM_MARKERS: &[&str] = &["pragma solidity", "msg.sender"];
const SOROBAN_MARKERS: &[&str] = &[SDK_IMPORT, CONTRACT_MARKER];

/// Result of [`validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            code: None,
        }
    }

    pub fn invalid(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            code: Some(code),
        }
    }
}

/// Validator with a configurable size ceiling.
#[derive(Clone, Copy, Debug)]
pub struct SourceValidator {
    max_bytes: usize,
}

impl Default for SourceValidator {
    fn default() -> Self {
        Self::new(MAX_SOURCE_BYTES)
    }
}

impl SourceValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check `source` for `target`. Checks run empty → size → cross-domain →
    /// required tokens; the first failure wins.
    pub fn validate(&self, source: &str, target: TargetLanguage) -> ValidationOutcome {
        if source.trim().is_empty() {
            return ValidationOutcome::invalid(ErrorCode::ValidationEmptySource, "empty source");
        }

        if source.len() > self.max_bytes {
            return ValidationOutcome::invalid(
                ErrorCode::ValidationTooLarge,
                format!(
                    "source is {} bytes, limit is {} bytes",
                    source.len(),
                    self.max_bytes
                ),
            );
        }

        let foreign = match target {
            TargetLanguage::Solidity => SOROBAN_MARKERS,
            TargetLanguage::RustSoroban => EVM_MARKERS,
        };
        if let Some(marker) = foreign.iter().find(|m| source.contains(**m)) {
            return ValidationOutcome::invalid(
                ErrorCode::ValidationCrossDomain,
                format!("{} source contains foreign marker `{}`", target, marker),
            );
        }

        if target == TargetLanguage::RustSoroban {
            if !source.contains(SDK_IMPORT) {
                return ValidationOutcome::invalid(
                    ErrorCode::ValidationMissingSdkImport,
                    format!("missing import: `{}`", SDK_IMPORT),
                );
            }
            if !source.contains(CONTRACT_MARKER) {
                return ValidationOutcome::invalid(
                    ErrorCode::ValidationMissingContractMarker,
                    format!("missing contract marker: `{}`", CONTRACT_MARKER),
                );
            }
        }

        ValidationOutcome::ok()
    }
}

/// Validate with the default 1 MiB ceiling.
pub fn validate(source: &str, target: TargetLanguage) -> ValidationOutcome {
    SourceValidator::default().validate(source, target)
}
