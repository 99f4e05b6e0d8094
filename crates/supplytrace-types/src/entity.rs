use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Registry-assigned entity identifier. The first id is 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const FIRST: EntityId = EntityId(1);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> EntityId {
        EntityId(self.0 + 1)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A tracked product.
///
/// `content_ref` and `metadata_ref` are opaque references owned by an
/// external content store and never change after creation. `status` is
/// overwritten in place; its history lives in the provenance log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub owner: Identity,
    pub content_ref: String,
    pub metadata_ref: String,
    pub status: String,
}
