//! # SupplyTrace Journal
//!
//! Write-ahead journal for the SupplyTrace store. Every committed
//! transaction becomes one CRC-framed record, and records are linked by a
//! BLAKE3 hash chain so that tampering and truncation are detectable.
//!
//! Replaying the journal in order reproduces the store exactly.

#![deny(unsafe_code)]

pub mod error;
pub mod journal;
pub mod record;
pub mod storage;

pub use error::JournalError;
pub use journal::{IntegrityReport, Journal, SyncMode};
pub use record::JournalRecord;
pub use storage::{FileJournal, JournalStorage, MemoryJournal};
