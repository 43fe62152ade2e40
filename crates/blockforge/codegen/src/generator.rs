//! Source generator: block list to contract source text.
//!
//! `generate` is total: an empty list and a list without a base block both
//! produce fixed placeholder text instead of an error, so callers can always
//! show *something* for the current canvas.

use serde::{Deserialize, Serialize};

use blockforge_types::{content_hash, Block, TargetLanguage};

use crate::plan::ContractPlan;
use crate::solidity::SolidityEmitter;
use crate::soroban::SorobanEmitter;

// ── Placeholders ───────────────────────────────────────────────────────

/// Returned for an empty block list.
pub const EMPTY_PLACEHOLDER: &str = "// Add blocks to the canvas to start building your contract.\n";

/// Returned when no enabled base (token/NFT) block is present.
pub const NO_BASE_PLACEHOLDER: &str =
    "// Add a base block (Token or NFT) to generate contract code.\n";

// ── Emitter Trait ──────────────────────────────────────────────────────

/// Renders a [`ContractPlan`] in one target language.
///
/// Implementations must be deterministic: no clocks, no randomness, no
/// iteration over unordered collections.
pub trait ContractEmitter: Send + Sync {
    fn target(&self) -> TargetLanguage;

    fn emit(&self, plan: &ContractPlan) -> String;
}

/// The emitter for `target`.
pub fn emitter_for(target: TargetLanguage) -> &'static dyn ContractEmitter {
    match target {
        TargetLanguage::Solidity => &SolidityEmitter,
        TargetLanguage::RustSoroban => &SorobanEmitter,
    }
}

// ── Generated Source ───────────────────────────────────────────────────

/// Generated text plus the metadata a compilation request needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSource {
    pub target_language: TargetLanguage,
    pub text: String,
    /// Empty when `text` is a placeholder.
    pub contract_name: String,
}

impl GeneratedSource {
    /// Whether this is one of the fixed placeholders.
    pub fn is_placeholder(&self) -> bool {
        self.contract_name.is_empty()
    }

    pub fn source_hash(&self) -> String {
        source_hash(&self.text)
    }
}

/// BLAKE3 hex digest of source text.
pub fn source_hash(text: &str) -> String {
    content_hash(text.as_bytes())
}

// ── Entry Points ───────────────────────────────────────────────────────

/// Generate source text for `blocks` in `target`.
pub fn generate(blocks: &[Block], target: TargetLanguage) -> String {
    generate_source(blocks, target).text
}

/// Generate source text together with the resolved contract name.
pub fn generate_source(blocks: &[Block], target: TargetLanguage) -> GeneratedSource {
    if blocks.is_empty() {
        return placeholder(target, EMPTY_PLACEHOLDER);
    }

    let Some(plan) = ContractPlan::from_blocks(blocks) else {
        return placeholder(target, NO_BASE_PLACEHOLDER);
    };

    let text = emitter_for(target).emit(&plan);
    tracing::debug!(
        target_language = %target,
        contract = %plan.contract_name,
        features = plan.features.len(),
        bytes = text.len(),
        "Generated contract source"
    );

    GeneratedSource {
        target_language: target,
        text,
        contract_name: plan.contract_name,
    }
}

fn placeholder(target: TargetLanguage, text: &str) -> GeneratedSource {
    GeneratedSource {
        target_language: target,
        text: text.to_string(),
        contract_name: String::new(),
    }
}
