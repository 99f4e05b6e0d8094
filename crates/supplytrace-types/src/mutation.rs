use crate::entity::{EntityId, EntityRecord};
use crate::identity::Identity;
use crate::provenance::ProvenanceEntry;
use crate::role::OperationalRole;
use serde::{Deserialize, Serialize};

/// A resolved state transition, as written to the journal.
///
/// Mutations carry every value the store assigned (ids, indices,
/// timestamps) so replaying them reproduces the exact same state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// First record of every journal; fixes the ADMIN identity.
    Genesis { admin: Identity },
    RoleGranted {
        role: OperationalRole,
        identity: Identity,
    },
    RoleRevoked {
        role: OperationalRole,
        identity: Identity,
    },
    EntityCreated { record: EntityRecord },
    StatusUpdated { id: EntityId, status: String },
    EventAppended { index: u64, entry: ProvenanceEntry },
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Genesis { .. } => "genesis",
            Mutation::RoleGranted { .. } => "role_granted",
            Mutation::RoleRevoked { .. } => "role_revoked",
            Mutation::EntityCreated { .. } => "entity_created",
            Mutation::StatusUpdated { .. } => "status_updated",
            Mutation::EventAppended { .. } => "event_appended",
        }
    }
}
