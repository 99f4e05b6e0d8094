//! Entity registry commands

use anyhow::Result;
use clap::Subcommand;
use serde_json::{json, Value};
use supplytrace_kernel::{EntityId, EntityRegistry, Identity};

use super::Context;

/// Entity subcommands
#[derive(Subcommand)]
pub enum EntityCommands {
    /// Register a new entity (requires OPERATOR_CREATE)
    Create {
        /// Content reference, e.g. an IPFS CID
        content_ref: String,

        /// Metadata reference, e.g. a token URI
        metadata_ref: String,

        /// Initial status
        #[arg(long, default_value = "CREATED")]
        status: String,

        /// Owner; defaults to the calling identity
        #[arg(long)]
        owner: Option<String>,
    },

    /// Overwrite an entity's status (requires any operational role)
    UpdateStatus { id: u64, status: String },

    /// Show the full entity record
    Get { id: u64 },

    /// Show an entity's owner
    Owner { id: u64 },

    /// Show an entity's current status
    Status { id: u64 },

    /// Show the most recently assigned id and the entity count
    Latest,
}

/// Execute an entity command
pub fn execute(command: EntityCommands, ctx: &Context) -> Result<Value> {
    let entities = EntityRegistry::new(ctx.tracker.clone());

    match command {
        EntityCommands::Create {
            content_ref,
            metadata_ref,
            status,
            owner,
        } => {
            let owner = owner.map(Identity::new).unwrap_or_else(|| ctx.caller.clone());
            let id = entities.create(&ctx.caller, &owner, &content_ref, &metadata_ref, &status)?;
            Ok(json!({ "id": id, "owner": owner, "status": status }))
        }

        EntityCommands::UpdateStatus { id, status } => {
            let id = EntityId(id);
            entities.update_status(&ctx.caller, id, &status)?;
            Ok(json!({ "id": id, "status": status }))
        }

        EntityCommands::Get { id } => Ok(serde_json::to_value(entities.get(EntityId(id))?)?),

        EntityCommands::Owner { id } => {
            let owner = entities.owner_of(EntityId(id))?;
            Ok(json!({ "id": id, "owner": owner }))
        }

        EntityCommands::Status { id } => {
            let status = entities.status_of(EntityId(id))?;
            Ok(json!({ "id": id, "status": status }))
        }

        EntityCommands::Latest => Ok(json!({
            "latest_id": entities.latest_id()?,
            "count": entities.len()?,
        })),
    }
}
