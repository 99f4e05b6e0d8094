//! Role registry commands

use anyhow::Result;
use clap::Subcommand;
use serde_json::{json, Value};
use supplytrace_kernel::{Identity, OperationalRole, Role, RoleRegistry};

use super::Context;

/// Role subcommands
#[derive(Subcommand)]
pub enum RoleCommands {
    /// Grant an operational role (admin only)
    Grant {
        /// Role tag or party alias, e.g. OPERATOR_TRANSIT or distributor
        role: OperationalRole,
        identity: String,
    },

    /// Revoke an operational role (admin only)
    Revoke {
        role: OperationalRole,
        identity: String,
    },

    /// Check whether an identity holds a role
    Check {
        /// ADMIN or an operational role
        role: Role,
        identity: String,
    },

    /// List every role an identity holds
    Of { identity: String },

    /// List the holders of an operational role
    Holders { role: OperationalRole },
}

/// Execute a role command
pub fn execute(command: RoleCommands, ctx: &Context) -> Result<Value> {
    let roles = RoleRegistry::new(ctx.tracker.clone());

    match command {
        RoleCommands::Grant { role, identity } => {
            let identity = Identity::new(identity);
            roles.grant(&ctx.caller, role, &identity)?;
            Ok(json!({ "role": role.as_str(), "identity": identity, "held": true }))
        }

        RoleCommands::Revoke { role, identity } => {
            let identity = Identity::new(identity);
            roles.revoke(&ctx.caller, role, &identity)?;
            Ok(json!({ "role": role.as_str(), "identity": identity, "held": false }))
        }

        RoleCommands::Check { role, identity } => {
            let identity = Identity::new(identity);
            let held = roles.has_role(role, &identity);
            Ok(json!({ "role": role.as_str(), "identity": identity, "held": held }))
        }

        RoleCommands::Of { identity } => {
            let identity = Identity::new(identity);
            let held: Vec<&str> = roles.roles_of(&identity)?.iter().map(Role::as_str).collect();
            Ok(json!({ "identity": identity, "roles": held }))
        }

        RoleCommands::Holders { role } => {
            let holders = roles.holders(role)?;
            Ok(json!({ "role": role.as_str(), "holders": holders }))
        }
    }
}
