use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// An operational role tag that ADMIN can grant or revoke.
///
/// Tags are flat: no tag implies another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalRole {
    OperatorCreate,
    OperatorTransit,
    OperatorReceive,
    OperatorAudit,
}

impl OperationalRole {
    /// Every operational tag, in a stable order.
    pub const ALL: [OperationalRole; 4] = [
        OperationalRole::OperatorCreate,
        OperationalRole::OperatorTransit,
        OperationalRole::OperatorReceive,
        OperationalRole::OperatorAudit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalRole::OperatorCreate => "OPERATOR_CREATE",
            OperationalRole::OperatorTransit => "OPERATOR_TRANSIT",
            OperationalRole::OperatorReceive => "OPERATOR_RECEIVE",
            OperationalRole::OperatorAudit => "OPERATOR_AUDIT",
        }
    }

    /// The supply-chain party that conventionally holds this tag.
    pub fn party(&self) -> &'static str {
        match self {
            OperationalRole::OperatorCreate => "manufacturer",
            OperationalRole::OperatorTransit => "distributor",
            OperationalRole::OperatorReceive => "retailer",
            OperationalRole::OperatorAudit => "regulator",
        }
    }
}

impl std::fmt::Display for OperationalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalRole {
    type Err = RoleParseError;

    /// Accepts canonical tags (`OPERATOR_TRANSIT`) and party aliases
    /// (`distributor`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        OperationalRole::ALL
            .into_iter()
            .find(|role| {
                role.as_str() == normalized || role.party().eq_ignore_ascii_case(s.trim())
            })
            .ok_or_else(|| RoleParseError(s.to_string()))
    }
}

/// Any role the registry can answer `has_role` for.
///
/// ADMIN is fixed when the store is created and is never granted or revoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    OperatorCreate,
    OperatorTransit,
    OperatorReceive,
    OperatorAudit,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::OperatorCreate => "OPERATOR_CREATE",
            Role::OperatorTransit => "OPERATOR_TRANSIT",
            Role::OperatorReceive => "OPERATOR_RECEIVE",
            Role::OperatorAudit => "OPERATOR_AUDIT",
        }
    }

    /// The operational tag behind this role, if it is not ADMIN.
    pub fn operational(&self) -> Option<OperationalRole> {
        match self {
            Role::Admin => None,
            Role::OperatorCreate => Some(OperationalRole::OperatorCreate),
            Role::OperatorTransit => Some(OperationalRole::OperatorTransit),
            Role::OperatorReceive => Some(OperationalRole::OperatorReceive),
            Role::OperatorAudit => Some(OperationalRole::OperatorAudit),
        }
    }
}

impl From<OperationalRole> for Role {
    fn from(role: OperationalRole) -> Self {
        match role {
            OperationalRole::OperatorCreate => Role::OperatorCreate,
            OperationalRole::OperatorTransit => Role::OperatorTransit,
            OperationalRole::OperatorReceive => Role::OperatorReceive,
            OperationalRole::OperatorAudit => Role::OperatorAudit,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("admin") {
            return Ok(Role::Admin);
        }
        s.parse::<OperationalRole>().map(Role::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role tag: {0}")]
pub struct RoleParseError(pub String);
