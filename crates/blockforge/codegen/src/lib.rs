//! # blockforge-codegen
//!
//! Turns a block list into contract source and gates source text before it
//! reaches a compiler.
//!
//! ```text
//! [Block] ──► ContractPlan ──► SolidityEmitter ──► pragma/contract text
//!                         └──► SorobanEmitter  ──► #![no_std] crate text
//!
//! source text ──► SourceValidator ──► ValidationOutcome
//! ```
//!
//! Generation is a pure function of `(blocks, target)`: the same input
//! always yields byte-identical text, which makes the BLAKE3
//! [`source_hash`] usable as a cache key.

#![deny(unsafe_code)]

pub mod generator;
pub mod plan;
pub mod solidity;
pub mod soroban;
pub mod validator;
mod writer;

pub use generator::{
    emitter_for, generate, generate_source, source_hash, ContractEmitter, GeneratedSource,
    EMPTY_PLACEHOLDER, NO_BASE_PLACEHOLDER,
};
pub use plan::{BasePlan, ContractPlan, Feature};
pub use solidity::SolidityEmitter;
pub use soroban::SorobanEmitter;
pub use validator::{validate, SourceValidator, ValidationOutcome, MAX_SOURCE_BYTES};
