//! # blockforge-types
//!
//! Shared vocabulary for the blockforge compilation core.
//!
//! - [`Block`] / [`BlockKind`]: the ordered feature list (the IR) that the
//!   source generator consumes. Block kinds form a closed set so that every
//!   consumer can match them exhaustively.
//! - [`JobKind`] / [`TargetLanguage`]: what a compilation produces.
//! - [`JobRecord`] / [`JobState`]: durable job bookkeeping and the
//!   forward-only state machine.
//! - [`Artifact`]: compiled output, addressed by [`ArtifactId`].
//! - [`ErrorCode`] / [`ErrorRecord`]: stable machine-readable failures.

#![deny(unsafe_code)]

pub mod artifact;
pub mod block;
pub mod error;
pub mod job;
pub mod target;

pub use artifact::{content_hash, Artifact, ArtifactId};
pub use block::{
    check_blocks, Block, BlockError, BlockKind, BlockType, CappedConfig, NftConfig,
    RoyaltyConfig, TokenConfig,
};
pub use error::{ErrorCode, ErrorRecord};
pub use job::{
    ExternalState, InvalidTransition, JobId, JobInput, JobRecord, JobState, JobTransition,
};
pub use target::{JobKind, TargetLanguage};
