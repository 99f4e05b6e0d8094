use std::collections::{BTreeSet, HashMap};

use supplytrace_types::{
    EntityId, EntityRecord, Identity, Mutation, OperationalRole, ProvenanceEntry, Role,
};

/// The whole tracker state: role table, entity records, provenance sequences.
///
/// Entities are dense: id `n` lives at position `n - 1`, and its history at
/// the same position in `history`.
#[derive(Debug)]
pub(crate) struct LedgerState {
    admin: Identity,
    grants: HashMap<OperationalRole, BTreeSet<Identity>>,
    entities: Vec<EntityRecord>,
    history: Vec<Vec<ProvenanceEntry>>,
}

impl LedgerState {
    pub(crate) fn new(admin: Identity) -> Self {
        Self {
            admin,
            grants: HashMap::new(),
            entities: Vec::new(),
            history: Vec::new(),
        }
    }

    pub(crate) fn is_admin(&self, identity: &Identity) -> bool {
        &self.admin == identity
    }

    pub(crate) fn holds(&self, role: OperationalRole, identity: &Identity) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|holders| holders.contains(identity))
    }

    pub(crate) fn has_role(&self, role: Role, identity: &Identity) -> bool {
        match role.operational() {
            Some(tag) => self.holds(tag, identity),
            None => self.is_admin(identity),
        }
    }

    pub(crate) fn holds_any_operational(&self, identity: &Identity) -> bool {
        OperationalRole::ALL
            .into_iter()
            .any(|role| self.holds(role, identity))
    }

    pub(crate) fn roles_of(&self, identity: &Identity) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.is_admin(identity) {
            roles.push(Role::Admin);
        }
        roles.extend(
            OperationalRole::ALL
                .into_iter()
                .filter(|role| self.holds(*role, identity))
                .map(Role::from),
        );
        roles
    }

    pub(crate) fn holders(&self, role: OperationalRole) -> Vec<Identity> {
        self.grants
            .get(&role)
            .map(|holders| holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn slot(id: EntityId) -> Option<usize> {
        id.value()
            .checked_sub(1)
            .and_then(|slot| usize::try_from(slot).ok())
    }

    pub(crate) fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        Self::slot(id).and_then(|slot| self.entities.get(slot))
    }

    pub(crate) fn history(&self, id: EntityId) -> Option<&[ProvenanceEntry]> {
        Self::slot(id)
            .and_then(|slot| self.history.get(slot))
            .map(Vec::as_slice)
    }

    pub(crate) fn next_id(&self) -> EntityId {
        EntityId(self.entities.len() as u64 + 1)
    }

    pub(crate) fn latest_id(&self) -> Option<EntityId> {
        self.entities.last().map(|record| record.id)
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Apply one resolved mutation, checking it is consistent with the
    /// current state. Used both for live transactions and for replay.
    pub(crate) fn apply(&mut self, mutation: &Mutation) -> Result<(), String> {
        match mutation {
            Mutation::Genesis { admin } => {
                if admin != &self.admin {
                    return Err(format!(
                        "genesis admin {admin} does not match configured admin {}",
                        self.admin
                    ));
                }
            }
            Mutation::RoleGranted { role, identity } => {
                self.grants
                    .entry(*role)
                    .or_default()
                    .insert(identity.clone());
            }
            Mutation::RoleRevoked { role, identity } => {
                if let Some(holders) = self.grants.get_mut(role) {
                    holders.remove(identity);
                }
            }
            Mutation::EntityCreated { record } => {
                let expected = self.next_id();
                if record.id != expected {
                    return Err(format!(
                        "entity created with id {}, expected {expected}",
                        record.id
                    ));
                }
                self.entities.push(record.clone());
                self.history.push(Vec::new());
            }
            Mutation::StatusUpdated { id, status } => {
                let slot = Self::slot(*id)
                    .filter(|slot| *slot < self.entities.len())
                    .ok_or_else(|| format!("status update for unknown entity {id}"))?;
                self.entities[slot].status = status.clone();
            }
            Mutation::EventAppended { index, entry } => {
                let slot = Self::slot(entry.entity_id)
                    .filter(|slot| *slot < self.history.len())
                    .ok_or_else(|| format!("event for unknown entity {}", entry.entity_id))?;
                let log = &mut self.history[slot];
                if *index != log.len() as u64 {
                    return Err(format!(
                        "event for entity {} at index {index}, expected {}",
                        entry.entity_id,
                        log.len()
                    ));
                }
                log.push(entry.clone());
            }
        }
        Ok(())
    }

    /// Undo the most recent application of `mutation`.
    pub(crate) fn revert(&mut self, mutation: &Mutation, previous: &Previous) {
        match (mutation, previous) {
            (Mutation::RoleGranted { role, identity }, _)
            | (Mutation::RoleRevoked { role, identity }, _) => {
                let holders = self.grants.entry(*role).or_default();
                match previous {
                    Previous::Held(true) => {
                        holders.insert(identity.clone());
                    }
                    _ => {
                        holders.remove(identity);
                    }
                }
            }
            (Mutation::EntityCreated { .. }, _) => {
                self.entities.pop();
                self.history.pop();
            }
            (Mutation::StatusUpdated { id, .. }, Previous::Status(old)) => {
                if let Some(slot) = Self::slot(*id) {
                    if let Some(record) = self.entities.get_mut(slot) {
                        record.status = old.clone();
                    }
                }
            }
            (Mutation::EventAppended { entry, .. }, _) => {
                if let Some(slot) = Self::slot(entry.entity_id) {
                    if let Some(log) = self.history.get_mut(slot) {
                        log.pop();
                    }
                }
            }
            (Mutation::Genesis { .. }, _) | (Mutation::StatusUpdated { .. }, _) => {}
        }
    }

    /// What `revert` needs to restore after `mutation` is applied.
    pub(crate) fn previous_for(&self, mutation: &Mutation) -> Previous {
        match mutation {
            Mutation::RoleGranted { role, identity } | Mutation::RoleRevoked { role, identity } => {
                Previous::Held(self.holds(*role, identity))
            }
            Mutation::StatusUpdated { id, .. } => self
                .entity(*id)
                .map(|record| Previous::Status(record.status.clone()))
                .unwrap_or(Previous::Nothing),
            _ => Previous::Nothing,
        }
    }
}

/// State overwritten by a mutation, kept for rollback.
#[derive(Debug, Clone)]
pub(crate) enum Previous {
    Nothing,
    Held(bool),
    Status(String),
}
