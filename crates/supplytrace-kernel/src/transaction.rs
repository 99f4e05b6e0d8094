use supplytrace_types::{
    Identity, Mutation, OperationalRole, TrackerError, TrackerResult,
};
use tracing::warn;

use crate::clock::Clock;
use crate::policy::FieldPolicy;
use crate::state::{LedgerState, Previous};

/// One serialized unit of work against the store.
///
/// Operations apply immediately so later steps see earlier ones, and every
/// applied mutation is staged for the journal. The tracker either journals
/// all staged mutations as one record or rolls every one of them back.
///
/// `caller` is the verified identity that opened the transaction. `acting`
/// is the identity that role checks run against and that is recorded as a
/// provenance actor; it starts as `caller` and changes only through
/// [`Transaction::act_as`].
pub struct Transaction<'a> {
    pub(crate) ledger: &'a mut LedgerState,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) policy: &'a dyn FieldPolicy,
    caller: Identity,
    acting: Identity,
    staged: Vec<Mutation>,
    undo: Vec<Previous>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        ledger: &'a mut LedgerState,
        clock: &'a dyn Clock,
        policy: &'a dyn FieldPolicy,
        caller: Identity,
    ) -> Self {
        Self {
            ledger,
            clock,
            policy,
            acting: caller.clone(),
            caller,
            staged: Vec::new(),
            undo: Vec::new(),
        }
    }

    pub fn caller(&self) -> &Identity {
        &self.caller
    }

    pub fn acting(&self) -> &Identity {
        &self.acting
    }

    /// Run the remaining steps under a delegated identity.
    pub fn act_as(&mut self, identity: Identity) {
        self.acting = identity;
    }

    pub fn holds(&self, role: OperationalRole) -> bool {
        self.ledger.holds(role, &self.acting)
    }

    pub fn require_role(&self, role: OperationalRole, operation: &str) -> TrackerResult<()> {
        if self.holds(role) {
            return Ok(());
        }
        warn!(
            caller = %self.acting,
            operation,
            required = %role,
            "Authorization denied"
        );
        Err(TrackerError::unauthorized(&self.acting, operation, role.as_str()))
    }

    pub fn require_any_operational(&self, operation: &str) -> TrackerResult<()> {
        if self.ledger.holds_any_operational(&self.acting) {
            return Ok(());
        }
        warn!(
            caller = %self.acting,
            operation,
            "Authorization denied: no operational role"
        );
        Err(TrackerError::unauthorized(
            &self.acting,
            operation,
            "any operational role",
        ))
    }

    pub fn require_admin(&self, operation: &str) -> TrackerResult<()> {
        if self.ledger.is_admin(&self.acting) {
            return Ok(());
        }
        warn!(caller = %self.acting, operation, "Authorization denied: not admin");
        Err(TrackerError::unauthorized(&self.acting, operation, "ADMIN"))
    }

    /// Apply a mutation and stage it for the journal.
    pub(crate) fn stage(&mut self, mutation: Mutation) -> TrackerResult<()> {
        let previous = self.ledger.previous_for(&mutation);
        self.ledger
            .apply(&mutation)
            .map_err(TrackerError::Replay)?;
        self.staged.push(mutation);
        self.undo.push(previous);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn staged(&self) -> &[Mutation] {
        &self.staged
    }

    /// Revert everything staged so far, newest first.
    pub(crate) fn rollback(&mut self) {
        while let (Some(mutation), Some(previous)) = (self.staged.pop(), self.undo.pop()) {
            self.ledger.revert(&mutation, &previous);
        }
    }
}
