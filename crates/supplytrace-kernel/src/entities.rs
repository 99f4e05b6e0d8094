use std::sync::Arc;

use supplytrace_types::{
    EntityId, EntityRecord, Identity, Mutation, OperationalRole, TrackerError, TrackerResult,
};
use tracing::{debug, info};

use crate::tracker::Tracker;
use crate::transaction::Transaction;

impl Transaction<'_> {
    /// Create an entity with the next sequential id.
    pub fn create(
        &mut self,
        owner: &Identity,
        content_ref: &str,
        metadata_ref: &str,
        initial_status: &str,
    ) -> TrackerResult<EntityId> {
        self.require_role(OperationalRole::OperatorCreate, "create")?;
        self.policy.check_status(initial_status)?;

        let id = self.ledger.next_id();
        self.stage(Mutation::EntityCreated {
            record: EntityRecord {
                id,
                owner: owner.clone(),
                content_ref: content_ref.to_string(),
                metadata_ref: metadata_ref.to_string(),
                status: initial_status.to_string(),
            },
        })?;
        info!(
            entity = %id,
            owner = %owner,
            by = %self.acting(),
            status = initial_status,
            "Entity created"
        );
        Ok(id)
    }

    /// Overwrite an entity's status.
    pub fn update_status(&mut self, id: EntityId, new_status: &str) -> TrackerResult<()> {
        self.require_any_operational("update_status")?;
        if self.ledger.entity(id).is_none() {
            return Err(TrackerError::NotFound(id));
        }
        self.policy.check_status(new_status)?;

        self.stage(Mutation::StatusUpdated {
            id,
            status: new_status.to_string(),
        })?;
        debug!(entity = %id, status = new_status, by = %self.acting(), "Status updated");
        Ok(())
    }
}

/// Registry of tracked entities.
///
/// Ids start at 1, are assigned in order, and are never reused. Content and
/// metadata references are immutable; status is overwritten in place.
#[derive(Clone)]
pub struct EntityRegistry {
    tracker: Arc<Tracker>,
}

impl EntityRegistry {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Requires OPERATOR_CREATE. Every success allocates a new id, so a
    /// blind retry creates a duplicate.
    pub fn create(
        &self,
        caller: &Identity,
        owner: &Identity,
        content_ref: &str,
        metadata_ref: &str,
        initial_status: &str,
    ) -> TrackerResult<EntityId> {
        self.tracker.transact(caller, |tx| {
            tx.create(owner, content_ref, metadata_ref, initial_status)
        })
    }

    /// Requires any operational role.
    pub fn update_status(
        &self,
        caller: &Identity,
        id: EntityId,
        new_status: &str,
    ) -> TrackerResult<()> {
        self.tracker
            .transact(caller, |tx| tx.update_status(id, new_status))
    }

    pub fn get(&self, id: EntityId) -> TrackerResult<EntityRecord> {
        self.with_entity(id, EntityRecord::clone)
    }

    pub fn owner_of(&self, id: EntityId) -> TrackerResult<Identity> {
        self.with_entity(id, |record| record.owner.clone())
    }

    pub fn status_of(&self, id: EntityId) -> TrackerResult<String> {
        self.with_entity(id, |record| record.status.clone())
    }

    pub fn content_ref_of(&self, id: EntityId) -> TrackerResult<String> {
        self.with_entity(id, |record| record.content_ref.clone())
    }

    pub fn metadata_ref_of(&self, id: EntityId) -> TrackerResult<String> {
        self.with_entity(id, |record| record.metadata_ref.clone())
    }

    /// Most recently assigned id, if any entity exists.
    pub fn latest_id(&self) -> TrackerResult<Option<EntityId>> {
        self.tracker.read(|state| state.latest_id())
    }

    pub fn len(&self) -> TrackerResult<usize> {
        self.tracker.read(|state| state.entity_count())
    }

    pub fn is_empty(&self) -> TrackerResult<bool> {
        Ok(self.len()? == 0)
    }

    fn with_entity<T>(&self, id: EntityId, f: impl FnOnce(&EntityRecord) -> T) -> TrackerResult<T> {
        self.tracker
            .read(|state| state.entity(id).map(f))?
            .ok_or(TrackerError::NotFound(id))
    }
}
