//! Compiled artifacts.
//!
//! An artifact is addressed by its own [`ArtifactId`], independent of the
//! job that produced it, so downstream consumers (deployment) never need the
//! job's internal representation. The payload is content-addressed with a
//! BLAKE3 hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::target::JobKind;

/// BLAKE3 hex digest of `data`.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Unique artifact identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable compiled output.
///
/// EVM artifacts carry `abi` + `bytecode`; Stellar artifacts carry
/// `wasm_bytes` (hex on the wire).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: JobKind,
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    /// Hex-encoded creation bytecode, without `0x` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes")]
    pub wasm_bytes: Option<Vec<u8>>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// BLAKE3 of the bytecode or WASM payload.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// EVM artifact from ABI and hex bytecode.
    pub fn evm(
        contract_name: impl Into<String>,
        abi: serde_json::Value,
        bytecode: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        let bytecode = bytecode.into();
        Self {
            id: ArtifactId::new(),
            kind: JobKind::CompileEvm,
            contract_name: contract_name.into(),
            abi: Some(abi),
            content_hash: content_hash(bytecode.as_bytes()),
            bytecode: Some(bytecode),
            wasm_bytes: None,
            warnings,
            created_at: Utc::now(),
        }
    }

    /// Stellar artifact from a WASM binary.
    pub fn wasm(contract_name: impl Into<String>, wasm: Vec<u8>, warnings: Vec<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            kind: JobKind::CompileStellar,
            contract_name: contract_name.into(),
            abi: None,
            bytecode: None,
            content_hash: content_hash(&wasm),
            wasm_bytes: Some(wasm),
            warnings,
            created_at: Utc::now(),
        }
    }

    /// Recompute the payload hash and compare.
    pub fn verify_hash(&self) -> bool {
        let payload: &[u8] = match (&self.bytecode, &self.wasm_bytes) {
            (Some(code), _) => code.as_bytes(),
            (None, Some(wasm)) => wasm,
            (None, None) => return false,
        };
        content_hash(payload) == self.content_hash
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&hex::encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
