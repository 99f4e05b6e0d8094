use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supplytrace_types::{Identity, Mutation};

use crate::error::JournalError;

/// One committed transaction.
///
/// A composite operation (register-and-log) is a single record holding
/// both of its mutations, so it is atomic on disk as well as in memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub caller: Identity,
    pub mutations: Vec<Mutation>,
    /// `None` only for the first record.
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl JournalRecord {
    /// Build a record and compute its chained hash.
    pub fn seal(
        sequence: u64,
        committed_at: DateTime<Utc>,
        caller: Identity,
        mutations: Vec<Mutation>,
        previous_hash: Option<String>,
    ) -> Result<Self, JournalError> {
        let hash = chain_hash(
            previous_hash.as_deref(),
            sequence,
            &committed_at,
            &caller,
            &mutations,
        )?;
        Ok(Self {
            sequence,
            committed_at,
            caller,
            mutations,
            previous_hash,
            hash,
        })
    }

    pub fn compute_hash(&self) -> Result<String, JournalError> {
        chain_hash(
            self.previous_hash.as_deref(),
            self.sequence,
            &self.committed_at,
            &self.caller,
            &self.mutations,
        )
    }

    /// True if the stored hash matches the record's contents.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash()
            .map(|computed| computed == self.hash)
            .unwrap_or(false)
    }
}

fn chain_hash(
    previous_hash: Option<&str>,
    sequence: u64,
    committed_at: &DateTime<Utc>,
    caller: &Identity,
    mutations: &[Mutation],
) -> Result<String, JournalError> {
    let serializable = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "committed_at": committed_at,
        "caller": caller,
        "mutations": mutations,
    });
    let serialized = serde_json::to_vec(&serializable)?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}
