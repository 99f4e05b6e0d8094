//! Provenance log commands

use anyhow::Result;
use clap::Subcommand;
use serde_json::{json, Value};
use supplytrace_kernel::{EntityId, ProvenanceLog};

use super::Context;

/// Provenance subcommands
#[derive(Subcommand)]
pub enum LogCommands {
    /// Append an event to an entity's history (requires any operational role)
    Append {
        id: u64,
        action: String,

        /// Attachment reference; empty means none
        #[arg(default_value = "")]
        content_ref: String,
    },

    /// Number of entries in an entity's history
    Count { id: u64 },

    /// One entry, by zero-based index
    Entry { id: u64, index: u64 },

    /// The full history, oldest first
    History { id: u64 },
}

/// Execute a provenance command
pub fn execute(command: LogCommands, ctx: &Context) -> Result<Value> {
    let log = ProvenanceLog::new(ctx.tracker.clone());

    match command {
        LogCommands::Append {
            id,
            action,
            content_ref,
        } => {
            let index = log.append(&ctx.caller, EntityId(id), &action, &content_ref)?;
            Ok(json!({ "id": id, "index": index, "action": action }))
        }

        LogCommands::Count { id } => Ok(json!({ "id": id, "count": log.count(EntityId(id))? })),

        LogCommands::Entry { id, index } => {
            Ok(serde_json::to_value(log.entry_at(EntityId(id), index)?)?)
        }

        LogCommands::History { id } => Ok(serde_json::to_value(log.history(EntityId(id))?)?),
    }
}
