use std::sync::Arc;

use serde::{Deserialize, Serialize};
use supplytrace_types::{EntityId, Identity, OperationalRole, TrackerResult};
use tracing::info;

use crate::tracker::Tracker;

/// Whether the orchestrator identity can currently do its job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub orchestrator: Identity,
    pub holds_create: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.holds_create
    }
}

/// Composite writer: create an entity and log its first event as one
/// atomic unit.
///
/// The orchestrator has its own identity. The caller must hold
/// OPERATOR_CREATE, and the two inner steps are authorized against the
/// orchestrator identity, which is also the actor of the logged entry. Both
/// grants must be in place or nothing is written.
#[derive(Clone)]
pub struct Orchestrator {
    tracker: Arc<Tracker>,
    identity: Identity,
}

impl Orchestrator {
    pub fn new(tracker: Arc<Tracker>, identity: Identity) -> Self {
        Self { tracker, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn register_and_log(
        &self,
        caller: &Identity,
        owner: &Identity,
        content_ref: &str,
        metadata_ref: &str,
        initial_status: &str,
    ) -> TrackerResult<EntityId> {
        let (id, index) = self.tracker.transact(caller, |tx| {
            tx.require_role(OperationalRole::OperatorCreate, "register_and_log")?;
            tx.act_as(self.identity.clone());
            let id = tx.create(owner, content_ref, metadata_ref, initial_status)?;
            let index = tx.append(id, initial_status, content_ref)?;
            Ok((id, index))
        })?;

        info!(
            entity = %id,
            index,
            caller = %caller,
            orchestrator = %self.identity,
            owner = %owner,
            "Entity registered and logged"
        );
        Ok(id)
    }

    pub fn readiness(&self) -> TrackerResult<Readiness> {
        let holds_create = self
            .tracker
            .read(|state| state.holds(OperationalRole::OperatorCreate, &self.identity))?;
        Ok(Readiness {
            orchestrator: self.identity.clone(),
            holds_create,
        })
    }
}
