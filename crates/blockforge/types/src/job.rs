//! Compilation job records and the job state machine.
//!
//! ```text
//! queued ──► running ──► completed
//!                  └───► failed
//! ```
//!
//! States only move forward. A job in a terminal state is never touched
//! again except by external archival.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{content_hash, ArtifactId};
use crate::error::ErrorRecord;
use crate::target::JobKind;

// ── Identifier ─────────────────────────────────────────────────────────

/// Opaque unique job identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── State ──────────────────────────────────────────────────────────────

/// Internal job state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Client-facing name, decoupled from the internal one.
    pub fn external(&self) -> ExternalState {
        match self {
            Self::Queued => ExternalState::Pending,
            Self::Running => ExternalState::Processing,
            Self::Completed => ExternalState::Completed,
            Self::Failed => ExternalState::Failed,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Externally visible job state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalState {
    Pending,
    Processing,
    Completed,
    Failed,
}

// ── Transitions ────────────────────────────────────────────────────────

/// A requested state change together with its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobTransition {
    Start,
    Complete { artifact_id: ArtifactId },
    Fail { error: ErrorRecord },
}

impl JobTransition {
    pub fn target(&self) -> JobState {
        match self {
            Self::Start => JobState::Running,
            Self::Complete { .. } => JobState::Completed,
            Self::Fail { .. } => JobState::Failed,
        }
    }
}

/// Rejected state change.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

// ── Input & Record ─────────────────────────────────────────────────────

/// What a job compiles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub source: String,
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_runs: Option<u32>,
}

impl JobInput {
    pub fn new(contract_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            contract_name: contract_name.into(),
            network: None,
            optimizer_runs: None,
        }
    }
}

/// Durable job record.
///
/// Carries the input as well so that queued work survives a restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: JobId,
    pub contract_type: JobKind,
    pub status: JobState,
    /// BLAKE3 hex digest of `input.source`.
    pub source_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<ArtifactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    pub input: JobInput,
}

impl JobRecord {
    /// New record in `queued`.
    pub fn new(kind: JobKind, input: JobInput) -> Self {
        Self {
            job_id: JobId::new(),
            contract_type: kind,
            status: JobState::Queued,
            source_hash: content_hash(input.source.as_bytes()),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            artifact_id: None,
            error: None,
            input,
        }
    }

    /// Apply a transition, rejecting anything that is not a forward edge.
    pub fn apply(&mut self, transition: JobTransition) -> Result<(), InvalidTransition> {
        let to = transition.target();
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }

        let now = Utc::now();
        match transition {
            JobTransition::Start => self.started_at = Some(now),
            JobTransition::Complete { artifact_id } => {
                self.artifact_id = Some(artifact_id);
                self.completed_at = Some(now);
            }
            JobTransition::Fail { error } => {
                self.error = Some(error);
                self.completed_at = Some(now);
            }
        }
        self.status = to;
        Ok(())
    }

    /// Human message of the terminal error, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
