use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use supplytrace_journal::{
    IntegrityReport, Journal, JournalRecord, JournalStorage, MemoryJournal, SyncMode,
};
use supplytrace_types::{Identity, Mutation, NodeId, TrackerError, TrackerResult};
use tracing::{debug, info, warn};

use crate::caller::{CallerVerifier, TrustAll};
use crate::clock::{Clock, HybridLogicalClock};
use crate::policy::{FieldPolicy, Permissive};
use crate::state::LedgerState;
use crate::transaction::Transaction;

/// Where the journal lives.
pub enum JournalTarget {
    Memory(MemoryJournal),
    File { path: PathBuf, sync: SyncMode },
    Custom {
        storage: Box<dyn JournalStorage>,
        sync: SyncMode,
    },
}

struct Store {
    ledger: LedgerState,
    journal: Journal,
}

/// The single owner of all tracker state.
///
/// State-changing operations run one at a time under the write lock and
/// are journaled before the lock is released. Queries share the read lock
/// and always see a fully committed state.
pub struct Tracker {
    admin: Identity,
    store: RwLock<Store>,
    clock: Box<dyn Clock>,
    policy: Box<dyn FieldPolicy>,
    verifier: Box<dyn CallerVerifier>,
}

pub struct TrackerBuilder {
    admin: Identity,
    journal: JournalTarget,
    clock: Option<Box<dyn Clock>>,
    policy: Box<dyn FieldPolicy>,
    verifier: Box<dyn CallerVerifier>,
}

impl TrackerBuilder {
    pub fn journal(mut self, journal: JournalTarget) -> Self {
        self.journal = journal;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn policy(mut self, policy: impl FieldPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn verifier(mut self, verifier: impl CallerVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    /// Open the journal, replay it, and hand back the shared store.
    ///
    /// An empty journal gets a genesis record naming the admin. A journal
    /// whose genesis names a different admin is refused.
    pub fn open(self) -> TrackerResult<Arc<Tracker>> {
        let (mut journal, records) = match self.journal {
            JournalTarget::Memory(storage) => Journal::open_memory(storage)?,
            JournalTarget::File { path, sync } => Journal::open_file(path, sync)?,
            JournalTarget::Custom { storage, sync } => Journal::open(storage, sync)?,
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(HybridLogicalClock::new(NodeId::default())));

        let mut ledger = LedgerState::new(self.admin.clone());
        if records.is_empty() {
            journal.append(
                &self.admin,
                Utc::now(),
                vec![Mutation::Genesis {
                    admin: self.admin.clone(),
                }],
            )?;
            info!(admin = %self.admin, journal = %journal.describe(), "Tracker initialized");
        } else {
            replay(&mut ledger, clock.as_ref(), &records)?;
            info!(
                admin = %self.admin,
                journal = %journal.describe(),
                records = records.len(),
                entities = ledger.entity_count(),
                "Tracker replayed from journal"
            );
        }

        Ok(Arc::new(Tracker {
            admin: self.admin,
            store: RwLock::new(Store { ledger, journal }),
            clock,
            policy: self.policy,
            verifier: self.verifier,
        }))
    }
}

fn replay(
    ledger: &mut LedgerState,
    clock: &dyn Clock,
    records: &[JournalRecord],
) -> TrackerResult<()> {
    let genesis_ok = records
        .first()
        .and_then(|record| record.mutations.first())
        .is_some_and(|mutation| matches!(mutation, Mutation::Genesis { .. }));
    if !genesis_ok {
        return Err(TrackerError::Replay(
            "journal does not start with a genesis record".to_string(),
        ));
    }

    for record in records {
        for mutation in &record.mutations {
            if matches!(mutation, Mutation::Genesis { .. }) && record.sequence != 1 {
                return Err(TrackerError::Replay(format!(
                    "genesis mutation in record {}",
                    record.sequence
                )));
            }
            ledger.apply(mutation).map_err(|reason| {
                TrackerError::Replay(format!("record {}: {reason}", record.sequence))
            })?;
            if let Mutation::EventAppended { entry, .. } = mutation {
                clock.observe(&entry.timestamp);
            }
        }
        debug!(
            sequence = record.sequence,
            mutations = record.mutations.len(),
            "Replayed journal record"
        );
    }
    Ok(())
}

impl Tracker {
    pub fn builder(admin: Identity) -> TrackerBuilder {
        TrackerBuilder {
            admin,
            journal: JournalTarget::Memory(MemoryJournal::new()),
            clock: None,
            policy: Box::new(Permissive),
            verifier: Box::new(TrustAll),
        }
    }

    /// A tracker with a fresh in-memory journal and default hooks.
    pub fn in_memory(admin: Identity) -> TrackerResult<Arc<Tracker>> {
        Self::builder(admin).open()
    }

    /// Fixed for the lifetime of the store.
    pub fn admin(&self) -> &Identity {
        &self.admin
    }

    /// Run `op` as one atomic, journaled transaction on behalf of `caller`.
    ///
    /// If `op` fails, or the journal write fails, every change it made is
    /// rolled back and nothing is journaled. A transaction that changes
    /// nothing writes no journal record.
    pub fn transact<T>(
        &self,
        caller: &Identity,
        op: impl FnOnce(&mut Transaction<'_>) -> TrackerResult<T>,
    ) -> TrackerResult<T> {
        self.verifier.verify(caller)?;

        let mut store = self.store.write().map_err(|_| TrackerError::LockPoisoned)?;
        let Store { ledger, journal } = &mut *store;
        let mut tx = Transaction::new(
            ledger,
            self.clock.as_ref(),
            self.policy.as_ref(),
            caller.clone(),
        );

        let value = match op(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                tx.rollback();
                return Err(e);
            }
        };

        if tx.is_empty() {
            return Ok(value);
        }

        match journal.append(caller, Utc::now(), tx.staged().to_vec()) {
            Ok(record) => {
                debug!(
                    sequence = record.sequence,
                    caller = %caller,
                    mutations = record.mutations.len(),
                    "Transaction committed"
                );
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                warn!(caller = %caller, error = %e, "Journal write failed, transaction rolled back");
                Err(e.into())
            }
        }
    }

    /// Run a read-only query against a consistent snapshot.
    pub(crate) fn read<T>(&self, query: impl FnOnce(&LedgerState) -> T) -> TrackerResult<T> {
        let store = self.store.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(query(&store.ledger))
    }

    /// Walk the journal's checksums and hash chain.
    pub fn verify(&self) -> TrackerResult<IntegrityReport> {
        let store = self.store.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(store.journal.verify()?)
    }

    /// Every committed journal record, in order.
    pub fn journal_records(&self) -> TrackerResult<Vec<JournalRecord>> {
        let store = self.store.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(store.journal.read_all()?)
    }

    pub fn journal_head(&self) -> TrackerResult<(u64, Option<String>)> {
        let store = self.store.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok((
            store.journal.last_sequence(),
            store.journal.head_hash().map(str::to_string),
        ))
    }
}
