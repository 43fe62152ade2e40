//! Contract plan: the block list reduced to what an emitter needs.
//!
//! The plan is computed once per generation: pick the first enabled base
//! block, resolve its naming, then collect enabled feature blocks in list
//! order. A feature kind contributes at most once.

use blockforge_types::{Block, BlockKind, BlockType};

/// Default decimals for fungible tokens.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Default royalty in basis points.
pub const DEFAULT_ROYALTY_BPS: u16 = 500;

/// Skeleton selected by the base block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BasePlan {
    Token { decimals: u8, initial_supply: u64 },
    Nft { base_uri: String },
}

/// An additive feature, in the order it appears in the block list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feature {
    Mint,
    Burn,
    Pausable,
    Capped { max_supply: u64 },
    Whitelist,
    Royalty { receiver: Option<String>, bps: u16 },
}

impl Feature {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Mint => BlockType::Mint,
            Self::Burn => BlockType::Burn,
            Self::Pausable => BlockType::Pausable,
            Self::Capped { .. } => BlockType::Capped,
            Self::Whitelist => BlockType::Whitelist,
            Self::Royalty { .. } => BlockType::Royalty,
        }
    }
}

/// Everything an emitter needs to render one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractPlan {
    /// Interpolated verbatim into the contract identifier.
    pub contract_name: String,
    pub symbol: String,
    pub base: BasePlan,
    pub features: Vec<Feature>,
}

impl ContractPlan {
    /// Build a plan, or `None` when no enabled base block exists.
    pub fn from_blocks(blocks: &[Block]) -> Option<Self> {
        let base_block = blocks.iter().find(|b| b.enabled && b.is_base())?;

        let (contract_name, symbol, base) = match &base_block.kind {
            BlockKind::Erc20(cfg) => (
                resolve_name(cfg.name.as_deref(), &base_block.name, "MyToken"),
                cfg.symbol.clone().unwrap_or_else(|| "TKN".to_string()),
                BasePlan::Token {
                    decimals: cfg.decimals.unwrap_or(DEFAULT_DECIMALS),
                    initial_supply: cfg.initial_supply.unwrap_or(0),
                },
            ),
            BlockKind::Nft(cfg) => (
                resolve_name(cfg.name.as_deref(), &base_block.name, "MyNFT"),
                cfg.symbol.clone().unwrap_or_else(|| "NFT".to_string()),
                BasePlan::Nft {
                    base_uri: cfg.base_uri.clone().unwrap_or_default(),
                },
            ),
            _ => return None,
        };

        let mut features: Vec<Feature> = Vec::new();
        for block in blocks.iter().filter(|b| b.enabled && !b.is_base()) {
            if features.iter().any(|f| f.block_type() == block.block_type()) {
                continue;
            }
            let feature = match &block.kind {
                BlockKind::Mint => Feature::Mint,
                BlockKind::Burn => Feature::Burn,
                BlockKind::Pausable => Feature::Pausable,
                BlockKind::Capped(cfg) => Feature::Capped {
                    max_supply: cfg.max_supply.unwrap_or(u64::MAX),
                },
                BlockKind::Whitelist => Feature::Whitelist,
                BlockKind::Royalty(cfg) => Feature::Royalty {
                    receiver: cfg.receiver.clone(),
                    bps: cfg.bps.unwrap_or(DEFAULT_ROYALTY_BPS),
                },
                BlockKind::Erc20(_) | BlockKind::Nft(_) => continue,
            };
            features.push(feature);
        }

        Some(Self {
            contract_name,
            symbol,
            base,
            features,
        })
    }

    pub fn has(&self, block_type: BlockType) -> bool {
        self.features.iter().any(|f| f.block_type() == block_type)
    }

    /// Supply ceiling if a `capped` block is enabled.
    pub fn max_supply(&self) -> Option<u64> {
        self.features.iter().find_map(|f| match f {
            Feature::Capped { max_supply } => Some(*max_supply),
            _ => None,
        })
    }

    pub fn is_nft(&self) -> bool {
        matches!(self.base, BasePlan::Nft { .. })
    }

    /// Token decimals; zero for NFTs.
    pub fn decimals(&self) -> u8 {
        match self.base {
            BasePlan::Token { decimals, .. } => decimals,
            BasePlan::Nft { .. } => 0,
        }
    }
}

fn resolve_name(configured: Option<&str>, block_name: &str, fallback: &str) -> String {
    match configured {
        Some(name) => name.to_string(),
        None if !block_name.is_empty() => block_name.to_string(),
        None => fallback.to_string(),
    }
}
