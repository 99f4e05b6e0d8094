use std::str::FromStr;

use serde::{Deserialize, Serialize};
use supplytrace_types::{Identity, OperationalRole, RoleParseError, TrackerResult};
use tracing::info;

use crate::tracker::Tracker;

/// One role assignment to make at setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: OperationalRole,
    pub identity: Identity,
}

impl RoleGrant {
    /// `role` may be a canonical tag or a party alias (`manufacturer`,
    /// `distributor`, `retailer`, `regulator`).
    pub fn parse(role: &str, identity: impl Into<String>) -> Result<Self, RoleParseError> {
        Ok(Self {
            role: role.parse()?,
            identity: Identity::new(identity),
        })
    }
}

impl FromStr for RoleGrant {
    type Err = RoleParseError;

    /// `role=identity`, e.g. `distributor=0xabc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, identity) = s
            .split_once('=')
            .ok_or_else(|| RoleParseError(s.to_string()))?;
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(RoleParseError(s.to_string()));
        }
        Self::parse(role, identity)
    }
}

/// Initial role assignments for a deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    pub grants: Vec<RoleGrant>,
    /// Always granted OPERATOR_CREATE, so the composite flow works.
    pub orchestrator: Option<Identity>,
}

impl ProvisioningPlan {
    /// Every grant the plan makes, orchestrator included.
    pub fn all_grants(&self) -> Vec<RoleGrant> {
        let mut grants = self.grants.clone();
        if let Some(orchestrator) = &self.orchestrator {
            grants.push(RoleGrant {
                role: OperationalRole::OperatorCreate,
                identity: orchestrator.clone(),
            });
        }
        grants
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub granted: usize,
    pub already_held: usize,
}

/// Apply a plan as one admin transaction. Safe to re-run: grants already
/// in place are skipped and nothing new is journaled for them.
pub fn provision(
    tracker: &Tracker,
    admin: &Identity,
    plan: &ProvisioningPlan,
) -> TrackerResult<ProvisioningReport> {
    let grants = plan.all_grants();
    let report = tracker.transact(admin, |tx| {
        let mut report = ProvisioningReport::default();
        for grant in &grants {
            if tx.grant(grant.role, &grant.identity)? {
                report.granted += 1;
            } else {
                report.already_held += 1;
            }
        }
        Ok(report)
    })?;
    info!(
        granted = report.granted,
        already_held = report.already_held,
        "Provisioning applied"
    );
    Ok(report)
}
