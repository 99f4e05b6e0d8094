//! SupplyTrace Types - the shared vocabulary of the tracker.
//!
//! Everything that crosses a crate boundary lives here: caller identities,
//! role tags, entity records, provenance entries, logical timestamps, the
//! journal's mutation records, and the error taxonomy returned to callers.

#![deny(unsafe_code)]

pub mod entity;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod provenance;
pub mod role;
pub mod time;

pub use entity::{EntityId, EntityRecord};
pub use error::{ErrorKind, TrackerError, TrackerResult};
pub use identity::Identity;
pub use mutation::Mutation;
pub use provenance::ProvenanceEntry;
pub use role::{OperationalRole, Role, RoleParseError};
pub use time::{NodeId, Timestamp};
