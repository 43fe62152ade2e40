//! Block model: the typed, ordered feature list consumed by code generation.
//!
//! On the wire a block is `{id, type, name, enabled, config}` with a loosely
//! typed `config` object. Internally each block type carries its own config
//! struct inside [`BlockKind`], so generators match on a closed set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ─────────────────────────────────────────────────────────────

/// Errors raised while decoding or checking a block list.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Two blocks in one list share an id.
    #[error("duplicate block id: {0}")]
    DuplicateId(String),

    /// More than one enabled base block (token/NFT).
    #[error("only one base block may be enabled (found '{first}' and '{second}')")]
    MultipleBases { first: String, second: String },

    /// The `config` object does not fit the block type.
    #[error("invalid config for block '{id}': {reason}")]
    InvalidConfig { id: String, reason: String },
}

// ── Block Type ─────────────────────────────────────────────────────────

/// Discriminant of a block, as it appears in the `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Fungible token skeleton.
    #[serde(alias = "base-token", alias = "token")]
    Erc20,
    /// Non-fungible token skeleton.
    #[serde(alias = "base-nft", alias = "erc721")]
    Nft,
    Mint,
    Burn,
    Pausable,
    Capped,
    Whitelist,
    Royalty,
}

impl BlockType {
    /// Whether this type selects the contract skeleton.
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Erc20 | Self::Nft)
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Erc20 => "erc20",
            Self::Nft => "nft",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Pausable => "pausable",
            Self::Capped => "capped",
            Self::Whitelist => "whitelist",
            Self::Royalty => "royalty",
        };
        f.write_str(s)
    }
}

// ── Per-type Config ────────────────────────────────────────────────────

/// Config of a fungible token base block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Decimal places (default 18).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Supply minted to the deployer, in whole tokens (default 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_supply: Option<u64>,
}

/// Config of a non-fungible token base block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NftConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
}

/// Config of a supply cap block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CappedConfig {
    /// Ceiling in whole tokens (or token count for NFTs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_supply: Option<u64>,
}

/// Config of a royalty block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoyaltyConfig {
    /// Royalty receiver; defaults to the contract owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Royalty in basis points (default 500).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps: Option<u16>,
}

// ── Block Kind ─────────────────────────────────────────────────────────

/// A block's type together with its typed configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Erc20(TokenConfig),
    Nft(NftConfig),
    Mint,
    Burn,
    Pausable,
    Capped(CappedConfig),
    Whitelist,
    Royalty(RoyaltyConfig),
}

impl BlockKind {
    /// The wire discriminant of this kind.
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Erc20(_) => BlockType::Erc20,
            Self::Nft(_) => BlockType::Nft,
            Self::Mint => BlockType::Mint,
            Self::Burn => BlockType::Burn,
            Self::Pausable => BlockType::Pausable,
            Self::Capped(_) => BlockType::Capped,
            Self::Whitelist => BlockType::Whitelist,
            Self::Royalty(_) => BlockType::Royalty,
        }
    }

    fn from_parts(
        id: &str,
        block_type: BlockType,
        config: Option<serde_json::Value>,
    ) -> Result<Self, BlockError> {
        fn decode<T: serde::de::DeserializeOwned + Default>(
            id: &str,
            config: Option<serde_json::Value>,
        ) -> Result<T, BlockError> {
            match config {
                None | Some(serde_json::Value::Null) => Ok(T::default()),
                Some(value) => {
                    serde_json::from_value(value).map_err(|e| BlockError::InvalidConfig {
                        id: id.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        }

        Ok(match block_type {
            BlockType::Erc20 => Self::Erc20(decode(id, config)?),
            BlockType::Nft => Self::Nft(decode(id, config)?),
            BlockType::Mint => Self::Mint,
            BlockType::Burn => Self::Burn,
            BlockType::Pausable => Self::Pausable,
            BlockType::Capped => Self::Capped(decode(id, config)?),
            BlockType::Whitelist => Self::Whitelist,
            BlockType::Royalty => Self::Royalty(decode(id, config)?),
        })
    }

    fn config_value(&self) -> Option<serde_json::Value> {
        let value = match self {
            Self::Erc20(c) => serde_json::to_value(c),
            Self::Nft(c) => serde_json::to_value(c),
            Self::Capped(c) => serde_json::to_value(c),
            Self::Royalty(c) => serde_json::to_value(c),
            Self::Mint | Self::Burn | Self::Pausable | Self::Whitelist => return None,
        };
        value.ok()
    }
}

// ── Block ──────────────────────────────────────────────────────────────

/// One composable feature unit of a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct Block {
    /// Unique within a block list.
    pub id: String,
    /// Display name shown on the canvas.
    pub name: String,
    /// Disabled blocks are skipped by the generator.
    pub enabled: bool,
    pub kind: BlockKind,
}

impl Block {
    /// Create an enabled block whose display name is its type.
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        let name = kind.block_type().to_string();
        Self {
            id: id.into(),
            name,
            enabled: true,
            kind,
        }
    }

    /// Fungible token base block with a name and symbol.
    pub fn erc20(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(
            "base",
            BlockKind::Erc20(TokenConfig {
                name: Some(name.into()),
                symbol: Some(symbol.into()),
                ..Default::default()
            }),
        )
    }

    /// NFT base block with a name and symbol.
    pub fn nft(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(
            "base",
            BlockKind::Nft(NftConfig {
                name: Some(name.into()),
                symbol: Some(symbol.into()),
                ..Default::default()
            }),
        )
    }

    /// Same block with `enabled` set.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    pub fn is_base(&self) -> bool {
        self.block_type().is_base()
    }
}

/// Check list-level constraints: unique ids and at most one enabled base.
pub fn check_blocks(blocks: &[Block]) -> Result<(), BlockError> {
    let mut seen = HashSet::new();
    let mut base: Option<&Block> = None;

    for block in blocks {
        if !seen.insert(block.id.as_str()) {
            return Err(BlockError::DuplicateId(block.id.clone()));
        }
        if block.enabled && block.is_base() {
            if let Some(first) = base {
                return Err(BlockError::MultipleBases {
                    first: first.id.clone(),
                    second: block.id.clone(),
                });
            }
            base = Some(block);
        }
    }

    Ok(())
}

// ── Wire Form ──────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: BlockType,
    #[serde(default)]
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<RawBlock> for Block {
    type Error = BlockError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let kind = BlockKind::from_parts(&raw.id, raw.block_type, raw.config)?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            enabled: raw.enabled,
            kind,
        })
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        Self {
            id: block.id,
            block_type: block.kind.block_type(),
            name: block.name,
            enabled: block.enabled,
            config: block.kind.config_value(),
        }
    }
}
