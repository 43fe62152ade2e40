//! Compilation requests as received from clients.

use serde::{Deserialize, Serialize};

use blockforge_codegen::generate_source;
use blockforge_types::{check_blocks, Block, JobInput, JobKind};

use crate::error::{QueueError, QueueResult};

/// A compilation request: either raw source or a block list to generate
/// source from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Required with `source`; defaults to the generated name with `blocks`.
    #[serde(default)]
    pub contract_name: Option<String>,
    pub kind: JobKind,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub optimizer_runs: Option<u32>,
}

impl Submission {
    /// Raw-source submission.
    pub fn source(kind: JobKind, contract_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            contract_name: Some(contract_name.into()),
            kind,
            source: Some(source.into()),
            blocks: None,
            network: None,
            optimizer_runs: None,
        }
    }

    /// Block-list submission.
    pub fn blocks(kind: JobKind, blocks: Vec<Block>) -> Self {
        Self {
            contract_name: None,
            kind,
            source: None,
            blocks: Some(blocks),
            network: None,
            optimizer_runs: None,
        }
    }

    /// Check field presence and turn the request into a job input. Block
    /// lists are rendered in the target language of `kind`.
    pub fn resolve(self) -> QueueResult<(JobKind, JobInput)> {
        let requested_name = self
            .contract_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (source, contract_name) = match (self.source, self.blocks) {
            (Some(source), None) => {
                let name = requested_name.ok_or_else(|| {
                    QueueError::InvalidInput("contractName is required".to_string())
                })?;
                (source, name)
            }
            (None, Some(blocks)) => {
                check_blocks(&blocks)?;
                let generated = generate_source(&blocks, self.kind.target_language());
                if generated.is_placeholder() {
                    return Err(QueueError::InvalidInput(
                        "block list has no enabled base block".to_string(),
                    ));
                }
                let name = requested_name.unwrap_or(generated.contract_name);
                (generated.text, name)
            }
            _ => {
                return Err(QueueError::InvalidInput(
                    "exactly one of source and blocks is required".to_string(),
                ))
            }
        };

        if self.optimizer_runs.is_some() && self.kind != JobKind::CompileEvm {
            return Err(QueueError::InvalidInput(
                "optimizerRuns only applies to EVM compilation".to_string(),
            ));
        }

        Ok((
            self.kind,
            JobInput {
                source,
                contract_name,
                network: self.network,
                optimizer_runs: self.optimizer_runs,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockforge_types::{BlockKind, ErrorCode};

    #[test]
    fn source_requires_a_name() {
        let mut sub = Submission::source(JobKind::CompileEvm, "  ", "contract A {}");
        assert_eq!(sub.clone().resolve().unwrap_err().code(), ErrorCode::InvalidInput);

        sub.contract_name = Some("A".into());
        let (kind, input) = sub.resolve().unwrap();
        assert_eq!(kind, JobKind::CompileEvm);
        assert_eq!(input.contract_name, "A");
    }

    #[test]
    fn blocks_are_rendered_for_the_job_kind() {
        let sub = Submission::blocks(
            JobKind::CompileStellar,
            vec![Block::erc20("TestToken", "TST"), Block::new("m", BlockKind::Mint)],
        );
        let (_, input) = sub.resolve().unwrap();
        assert_eq!(input.contract_name, "TestToken");
        assert!(input.source.contains("soroban_sdk"));
        assert!(input.source.contains("pub fn mint("));
    }

    #[test]
    fn source_and_blocks_are_exclusive() {
        let mut both = Submission::blocks(JobKind::CompileEvm, vec![Block::erc20("A", "A")]);
        both.source = Some("contract A {}".into());
        assert!(matches!(both.resolve(), Err(QueueError::InvalidInput(_))));

        let mut neither = Submission::source(JobKind::CompileEvm, "A", "");
        neither.source = None;
        assert!(matches!(neither.resolve(), Err(QueueError::InvalidInput(_))));
    }

    #[test]
    fn block_lists_need_one_base() {
        let none = Submission::blocks(JobKind::CompileEvm, vec![Block::new("m", BlockKind::Mint)]);
        assert!(matches!(none.resolve(), Err(QueueError::InvalidInput(_))));

        let mut second = Block::nft("Art", "ART");
        second.id = "base2".into();
        let two = Submission::blocks(JobKind::CompileEvm, vec![Block::erc20("A", "A"), second]);
        assert!(matches!(two.resolve(), Err(QueueError::InvalidInput(_))));
    }

    #[test]
    fn deserializes_wire_form() {
        let sub: Submission = serde_json::from_value(serde_json::json!({
            "contractName": "TestToken",
            "kind": "evm",
            "blocks": [{"id": "b", "type": "erc20", "config": {"name": "TestToken", "symbol": "TST"}}],
            "optimizerRuns": 1000
        }))
        .unwrap();
        let (kind, input) = sub.resolve().unwrap();
        assert_eq!(kind, JobKind::CompileEvm);
        assert_eq!(input.optimizer_runs, Some(1000));
        assert!(input.source.contains("contract TestToken"));
    }
}
