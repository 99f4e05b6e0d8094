use std::sync::Arc;

use supplytrace_types::{
    EntityId, Identity, Mutation, ProvenanceEntry, TrackerError, TrackerResult,
};
use tracing::debug;

use crate::tracker::Tracker;
use crate::transaction::Transaction;

impl Transaction<'_> {
    /// Append an audit event for an existing entity. The actor is the
    /// acting identity and the timestamp comes from the store's clock.
    /// Returns the entry's permanent index.
    pub fn append(
        &mut self,
        entity_id: EntityId,
        action: &str,
        content_ref: &str,
    ) -> TrackerResult<u64> {
        self.require_any_operational("append")?;
        let index = self
            .ledger
            .history(entity_id)
            .map(|log| log.len() as u64)
            .ok_or(TrackerError::NotFound(entity_id))?;
        self.policy.check_action(action)?;

        let entry = ProvenanceEntry {
            entity_id,
            actor: self.acting().clone(),
            action: action.to_string(),
            content_ref: content_ref.to_string(),
            timestamp: self.clock.now(),
        };
        debug!(
            entity = %entity_id,
            index,
            actor = %entry.actor,
            action,
            timestamp = %entry.timestamp,
            "Provenance event appended"
        );
        self.stage(Mutation::EventAppended { index, entry })?;
        Ok(index)
    }
}

/// Append-only, per-entity audit history.
///
/// Entries are zero-indexed and never mutated, reordered, or removed.
#[derive(Clone)]
pub struct ProvenanceLog {
    tracker: Arc<Tracker>,
}

impl ProvenanceLog {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Requires any operational role. Not idempotent: every success adds
    /// an entry.
    pub fn append(
        &self,
        caller: &Identity,
        entity_id: EntityId,
        action: &str,
        content_ref: &str,
    ) -> TrackerResult<u64> {
        self.tracker
            .transact(caller, |tx| tx.append(entity_id, action, content_ref))
    }

    pub fn count(&self, entity_id: EntityId) -> TrackerResult<u64> {
        self.tracker
            .read(|state| state.history(entity_id).map(|log| log.len() as u64))?
            .ok_or(TrackerError::NotFound(entity_id))
    }

    pub fn entry_at(&self, entity_id: EntityId, index: u64) -> TrackerResult<ProvenanceEntry> {
        self.tracker.read(|state| {
            let log = state
                .history(entity_id)
                .ok_or(TrackerError::NotFound(entity_id))?;
            usize::try_from(index)
                .ok()
                .and_then(|i| log.get(i))
                .cloned()
                .ok_or(TrackerError::Index {
                    entity_id,
                    index,
                    count: log.len() as u64,
                })
        })?
    }

    /// The full timeline for one entity, oldest first.
    pub fn history(&self, entity_id: EntityId) -> TrackerResult<Vec<ProvenanceEntry>> {
        self.tracker
            .read(|state| state.history(entity_id).map(<[ProvenanceEntry]>::to_vec))?
            .ok_or(TrackerError::NotFound(entity_id))
    }
}
