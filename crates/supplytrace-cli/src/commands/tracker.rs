//! Orchestrator, provisioning, and journal commands

use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use supplytrace_kernel::{provision, Identity, Orchestrator, RoleGrant};

use super::Context;

/// Create an entity and log its first event as one unit.
pub fn register(
    ctx: &Context,
    owner: Option<String>,
    content_ref: &str,
    metadata_ref: &str,
    status: &str,
) -> Result<Value> {
    let orchestrator = Orchestrator::new(ctx.tracker.clone(), ctx.config.orchestrator_identity());
    let owner = owner.map(Identity::new).unwrap_or_else(|| ctx.caller.clone());
    let id = orchestrator.register_and_log(&ctx.caller, &owner, content_ref, metadata_ref, status)?;
    Ok(json!({
        "id": id,
        "owner": owner,
        "status": status,
        "orchestrator": orchestrator.identity(),
    }))
}

/// Apply the configured provisioning plan plus any extra grants.
pub fn provision_roles(ctx: &Context, extra: Vec<RoleGrant>) -> Result<Value> {
    let mut plan = ctx.config.plan().context("invalid provisioning entry")?;
    plan.grants.extend(extra);
    let report = provision(&ctx.tracker, &ctx.caller, &plan)?;
    Ok(json!({
        "granted": report.granted,
        "already_held": report.already_held,
        "grants": plan.all_grants(),
    }))
}

pub fn readiness(ctx: &Context) -> Result<Value> {
    let orchestrator = Orchestrator::new(ctx.tracker.clone(), ctx.config.orchestrator_identity());
    let readiness = orchestrator.readiness()?;
    Ok(json!({
        "orchestrator": readiness.orchestrator,
        "holds_create": readiness.holds_create,
        "ready": readiness.is_ready(),
    }))
}

/// Walk the journal's checksums and hash chain.
pub fn verify(ctx: &Context) -> Result<Value> {
    let report = ctx.tracker.verify()?;
    let (sequence, head) = ctx.tracker.journal_head()?;
    Ok(json!({
        "clean": report.is_clean(),
        "report": report,
        "head": { "sequence": sequence, "hash": head },
    }))
}
