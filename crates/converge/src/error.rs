//! Engine error taxonomy

use crate::types::ResourceKind;
use thiserror::Error;

/// Errors surfaced by the reconciliation engine
///
/// `UnknownKind` is a configuration-time defect and aborts a run before
/// any mutation. The other variants are resource-level: they fail the one
/// resource and the run continues, unless the spec is marked run-fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// A spec references a kind with no registered handler
    #[error("no handler registered for resource kind '{0}'")]
    UnknownKind(ResourceKind),

    /// The prober could not determine current state
    #[error("probe failed for {kind} '{id}': {reason}")]
    Probe {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    /// A guard referenced a resource never declared before this one
    #[error("guard on '{resource}' references {reference}, which has no outcome yet")]
    Guard { resource: String, reference: String },

    /// A primitive operation failed, after retries were exhausted if any
    #[error("operation {index} of {total} ({op}) failed: {reason}")]
    Apply {
        index: usize,
        total: usize,
        op: String,
        reason: String,
    },

    /// Desired attributes and observation disagree on shape
    #[error("invalid spec for '{id}': {reason}")]
    InvalidSpec { id: String, reason: String },
}

impl Error {
    pub fn probe(kind: ResourceKind, id: &str, reason: impl ToString) -> Self {
        Self::Probe {
            kind,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_spec(id: &str, reason: impl ToString) -> Self {
        Self::InvalidSpec {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
