use crate::entity::EntityId;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors returned to the immediate caller of a tracker operation.
///
/// A failed operation never leaves a partial write behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("{caller} is not authorized to {operation} (requires {required})")]
    Authorization {
        caller: Identity,
        operation: String,
        required: String,
    },

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    #[error("provenance index {index} out of range for entity {entity_id} ({count} entries)")]
    Index {
        entity_id: EntityId,
        index: u64,
        count: u64,
    },

    #[error("rejected by field policy: {0}")]
    Validation(String),

    #[error("caller rejected: {0}")]
    Authentication(String),

    #[error("journal error: {0}")]
    Journal(String),

    #[error("journal replay failed: {0}")]
    Replay(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Stable classification of a [`TrackerError`] for clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Authorization,
    NotFound,
    Index,
    Validation,
    Authentication,
    Journal,
    Replay,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Index => "INDEX",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Journal => "JOURNAL",
            ErrorKind::Replay => "REPLAY",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Authorization { .. } => ErrorKind::Authorization,
            TrackerError::NotFound(_) => ErrorKind::NotFound,
            TrackerError::Index { .. } => ErrorKind::Index,
            TrackerError::Validation(_) => ErrorKind::Validation,
            TrackerError::Authentication(_) => ErrorKind::Authentication,
            TrackerError::Journal(_) => ErrorKind::Journal,
            TrackerError::Replay(_) => ErrorKind::Replay,
            TrackerError::LockPoisoned => ErrorKind::Internal,
        }
    }

    /// Only durability failures are worth retrying; every other error is a
    /// deterministic consequence of the request and the current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Journal(_))
    }

    pub fn unauthorized(
        caller: &Identity,
        operation: impl Into<String>,
        required: impl Into<String>,
    ) -> Self {
        TrackerError::Authorization {
            caller: caller.clone(),
            operation: operation.into(),
            required: required.into(),
        }
    }
}
