//! # SupplyTrace Kernel
//!
//! A permissioned product registry coupled to an append-only provenance
//! log, with a composite writer that registers a product and logs its
//! first event atomically.
//!
//! All state lives in one [`Tracker`]. Components hold an `Arc<Tracker>`:
//!
//! - [`RoleRegistry`]: who holds which operational role; only the admin
//!   grants or revokes.
//! - [`EntityRegistry`]: tracked entities with sequential ids.
//! - [`ProvenanceLog`]: per-entity, zero-indexed audit history.
//! - [`Orchestrator`]: create-and-log as one unit under its own identity.
//!
//! Every state change runs as a [`Transaction`] under a single write lock
//! and is journaled before it becomes visible.

#![deny(unsafe_code)]

pub mod caller;
pub mod clock;
pub mod entities;
pub mod orchestrator;
pub mod policy;
pub mod provenance;
pub mod provisioning;
pub mod roles;
mod state;
pub mod tracker;
pub mod transaction;

pub use caller::{CallerVerifier, KnownCallers, TrustAll};
pub use clock::{Clock, HybridLogicalClock, ManualClock};
pub use entities::EntityRegistry;
pub use orchestrator::{Orchestrator, Readiness};
pub use policy::{EnumeratedPolicy, FieldPolicy, Permissive};
pub use provenance::ProvenanceLog;
pub use provisioning::{provision, ProvisioningPlan, ProvisioningReport, RoleGrant};
pub use roles::RoleRegistry;
pub use tracker::{JournalTarget, Tracker, TrackerBuilder};
pub use transaction::Transaction;

pub use supplytrace_journal::{IntegrityReport, SyncMode};
pub use supplytrace_types::{
    EntityId, EntityRecord, ErrorKind, Identity, Mutation, NodeId, OperationalRole,
    ProvenanceEntry, Role, RoleParseError, Timestamp, TrackerError, TrackerResult,
};
