use crate::entity::EntityId;
use crate::identity::Identity;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One immutable audit record attached to an entity.
///
/// `actor` is the immediate caller of the append, captured by the log.
/// An empty `content_ref` means "no attachment".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub entity_id: EntityId,
    pub actor: Identity,
    pub action: String,
    pub content_ref: String,
    pub timestamp: Timestamp,
}

impl ProvenanceEntry {
    pub fn has_attachment(&self) -> bool {
        !self.content_ref.is_empty()
    }
}
