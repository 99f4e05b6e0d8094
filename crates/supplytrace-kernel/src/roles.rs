use std::sync::Arc;

use supplytrace_types::{Identity, Mutation, OperationalRole, Role, TrackerResult};
use tracing::{info, warn};

use crate::tracker::Tracker;
use crate::transaction::Transaction;

impl Transaction<'_> {
    /// Grant `role` to `identity`. Returns false if it was already held.
    pub fn grant(&mut self, role: OperationalRole, identity: &Identity) -> TrackerResult<bool> {
        self.require_admin("grant")?;
        if self.ledger.holds(role, identity) {
            return Ok(false);
        }
        self.stage(Mutation::RoleGranted {
            role,
            identity: identity.clone(),
        })?;
        info!(role = %role, identity = %identity, by = %self.acting(), "Role granted");
        Ok(true)
    }

    /// Revoke `role` from `identity`. Returns false if it was not held.
    pub fn revoke(&mut self, role: OperationalRole, identity: &Identity) -> TrackerResult<bool> {
        self.require_admin("revoke")?;
        if !self.ledger.holds(role, identity) {
            return Ok(false);
        }
        self.stage(Mutation::RoleRevoked {
            role,
            identity: identity.clone(),
        })?;
        warn!(role = %role, identity = %identity, by = %self.acting(), "Role revoked");
        Ok(true)
    }
}

/// Authoritative table of who holds which operational role.
///
/// Only the admin may grant or revoke. Both are idempotent.
#[derive(Clone)]
pub struct RoleRegistry {
    tracker: Arc<Tracker>,
}

impl RoleRegistry {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    pub fn grant(
        &self,
        caller: &Identity,
        role: OperationalRole,
        identity: &Identity,
    ) -> TrackerResult<()> {
        self.tracker
            .transact(caller, |tx| tx.grant(role, identity))
            .map(|_| ())
    }

    pub fn revoke(
        &self,
        caller: &Identity,
        role: OperationalRole,
        identity: &Identity,
    ) -> TrackerResult<()> {
        self.tracker
            .transact(caller, |tx| tx.revoke(role, identity))
            .map(|_| ())
    }

    /// Never fails. An unreadable store answers `false`.
    pub fn has_role(&self, role: impl Into<Role>, identity: &Identity) -> bool {
        let role = role.into();
        self.tracker
            .read(|state| state.has_role(role, identity))
            .unwrap_or(false)
    }

    /// Every role `identity` holds, ADMIN first.
    pub fn roles_of(&self, identity: &Identity) -> TrackerResult<Vec<Role>> {
        self.tracker.read(|state| state.roles_of(identity))
    }

    pub fn holders(&self, role: OperationalRole) -> TrackerResult<Vec<Identity>> {
        self.tracker.read(|state| state.holders(role))
    }

    pub fn admin(&self) -> &Identity {
        self.tracker.admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplytrace_types::{ErrorKind, TrackerError};

    fn setup() -> (RoleRegistry, Identity) {
        let admin = Identity::new("deployer");
        let tracker = Tracker::in_memory(admin.clone()).unwrap();
        (RoleRegistry::new(tracker), admin)
    }

    #[test]
    fn admin_grants_and_revokes() {
        let (roles, admin) = setup();
        let distributor = Identity::new("distributor");

        roles
            .grant(&admin, OperationalRole::OperatorTransit, &distributor)
            .unwrap();
        assert!(roles.has_role(OperationalRole::OperatorTransit, &distributor));
        assert!(!roles.has_role(OperationalRole::OperatorCreate, &distributor));

        roles
            .revoke(&admin, OperationalRole::OperatorTransit, &distributor)
            .unwrap();
        assert!(!roles.has_role(OperationalRole::OperatorTransit, &distributor));
    }

    #[test]
    fn non_admin_cannot_grant_or_revoke() {
        let (roles, admin) = setup();
        let maker = Identity::new("maker");
        roles
            .grant(&admin, OperationalRole::OperatorCreate, &maker)
            .unwrap();

        let err = roles
            .grant(&maker, OperationalRole::OperatorAudit, &maker)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(matches!(err, TrackerError::Authorization { ref required, .. } if required == "ADMIN"));

        let err = roles
            .revoke(&maker, OperationalRole::OperatorCreate, &maker)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        assert_eq!(roles.roles_of(&maker).unwrap(), vec![Role::OperatorCreate]);
    }

    #[test]
    fn grant_and_revoke_are_idempotent() {
        let (roles, admin) = setup();
        let retailer = Identity::new("retailer");
        let tracker = roles.tracker.clone();

        roles
            .grant(&admin, OperationalRole::OperatorReceive, &retailer)
            .unwrap();
        let after_first = tracker.journal_head().unwrap();
        roles
            .grant(&admin, OperationalRole::OperatorReceive, &retailer)
            .unwrap();
        assert_eq!(tracker.journal_head().unwrap(), after_first);
        assert!(roles.has_role(OperationalRole::OperatorReceive, &retailer));

        roles
            .revoke(&admin, OperationalRole::OperatorAudit, &retailer)
            .unwrap();
        assert_eq!(tracker.journal_head().unwrap(), after_first);
    }

    #[test]
    fn admin_role_is_fixed() {
        let (roles, admin) = setup();
        assert!(roles.has_role(Role::Admin, &admin));
        assert!(!roles.has_role(Role::Admin, &Identity::new("maker")));
        assert_eq!(roles.admin(), &admin);
        // The admin holds no operational role until granted one.
        assert!(!roles.has_role(OperationalRole::OperatorCreate, &admin));
        assert_eq!(roles.roles_of(&admin).unwrap(), vec![Role::Admin]);
    }

    #[test]
    fn holders_lists_grantees() {
        let (roles, admin) = setup();
        for who in ["b-carrier", "a-carrier"] {
            roles
                .grant(&admin, OperationalRole::OperatorTransit, &Identity::new(who))
                .unwrap();
        }
        assert_eq!(
            roles.holders(OperationalRole::OperatorTransit).unwrap(),
            vec![Identity::new("a-carrier"), Identity::new("b-carrier")]
        );
    }
}
