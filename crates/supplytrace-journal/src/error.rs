use supplytrace_types::TrackerError;
use thiserror::Error;

/// Errors from journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("journal hash chain broken at sequence {sequence}")]
    BrokenChain { sequence: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("journal storage lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Serialization(e.to_string())
    }
}

impl From<JournalError> for TrackerError {
    fn from(e: JournalError) -> Self {
        TrackerError::Journal(e.to_string())
    }
}
