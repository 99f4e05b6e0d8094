//! SupplyTrace CLI
//!
//! Operates a journal-backed tracker from the command line:
//! - role grants and queries
//! - entity registration and status updates
//! - provenance appends and history
//! - orchestrated create-and-log, provisioning, and journal verification
//!
//! Each invocation replays the journal, runs one command, and prints JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use supplytrace_kernel::{Identity, RoleGrant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::entities::EntityCommands;
use commands::provenance::LogCommands;
use commands::roles::RoleCommands;
use commands::Context;
use crate::config::{JournalConfig, LoggingConfig, TrackerConfig};

/// SupplyTrace - role-gated product registry with a provenance log
#[derive(Parser)]
#[command(name = "supplytrace")]
#[command(about = "SupplyTrace - role-gated product registry with a provenance log", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SUPPLYTRACE_CONFIG")]
    config: Option<String>,

    /// Journal file; overrides the configured journal
    #[arg(short, long, env = "SUPPLYTRACE_JOURNAL_FILE", global = true)]
    journal: Option<PathBuf>,

    /// Identity to act as; defaults to the configured admin
    #[arg(long = "as", env = "SUPPLYTRACE_CALLER", global = true)]
    caller: Option<String>,

    /// Log level
    #[arg(long, env = "SUPPLYTRACE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "SUPPLYTRACE_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Role registry
    #[command(subcommand)]
    Roles(RoleCommands),

    /// Entity registry
    #[command(subcommand)]
    Entity(EntityCommands),

    /// Provenance log
    #[command(subcommand)]
    Log(LogCommands),

    /// Create an entity and log its first event in one step
    Register {
        content_ref: String,
        metadata_ref: String,

        /// Initial status, also logged as the first action
        #[arg(long, default_value = "CREATED")]
        status: String,

        /// Owner; defaults to the calling identity
        #[arg(long)]
        owner: Option<String>,
    },

    /// Apply the configured role grants (admin only)
    Provision {
        /// Extra grants as role=identity, e.g. distributor=0xabc
        grants: Vec<RoleGrant>,
    },

    /// Check that the orchestrator holds OPERATOR_CREATE
    Readiness,

    /// Verify journal checksums and hash chain
    Verify,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        TrackerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(path) = cli.journal {
        let sync = match &config.journal {
            JournalConfig::File { sync, .. } => *sync,
            JournalConfig::Memory => Default::default(),
        };
        config.journal = JournalConfig::File { path, sync };
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    init_tracing(&config.logging);

    if matches!(config.journal, JournalConfig::Memory) {
        warn!("Using an in-memory journal; nothing will be kept after this command");
    }

    let tracker = config.open_tracker()?;
    let caller = cli
        .caller
        .map(Identity::new)
        .unwrap_or_else(|| config.admin_identity());
    info!(caller = %caller, admin = %tracker.admin(), "Tracker opened");

    let ctx = Context::new(tracker, caller, config);
    let result = match cli.command {
        Commands::Roles(cmd) => commands::roles::execute(cmd, &ctx)?,
        Commands::Entity(cmd) => commands::entities::execute(cmd, &ctx)?,
        Commands::Log(cmd) => commands::provenance::execute(cmd, &ctx)?,
        Commands::Register {
            content_ref,
            metadata_ref,
            status,
            owner,
        } => commands::tracker::register(&ctx, owner, &content_ref, &metadata_ref, &status)?,
        Commands::Provision { grants } => commands::tracker::provision_roles(&ctx, grants)?,
        Commands::Readiness => commands::tracker::readiness(&ctx)?,
        Commands::Verify => commands::tracker::verify(&ctx)?,
    };

    output::print_json(&result)
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_and_global_flags() {
        let cli = Cli::try_parse_from([
            "supplytrace",
            "roles",
            "grant",
            "distributor",
            "0xabc",
            "--as",
            "0xdeployer",
        ])
        .unwrap();
        assert_eq!(cli.caller.as_deref(), Some("0xdeployer"));
        assert!(matches!(cli.command, Commands::Roles(RoleCommands::Grant { .. })));

        let cli = Cli::try_parse_from([
            "supplytrace",
            "provision",
            "manufacturer=0x1",
            "regulator=0x2",
        ])
        .unwrap();
        match cli.command {
            Commands::Provision { grants } => assert_eq!(grants.len(), 2),
            _ => panic!("expected provision"),
        }

        assert!(Cli::try_parse_from(["supplytrace", "roles", "grant", "warehouse", "x"]).is_err());
    }

    #[test]
    fn flag_variables_leave_config_loading_intact() {
        let vars: ::config::Map<String, String> = Cli::command()
            .get_arguments()
            .filter_map(|arg| arg.get_env())
            .map(|name| (name.to_string_lossy().into_owned(), "1".to_string()))
            .collect();
        assert!(vars.contains_key("SUPPLYTRACE_JOURNAL_FILE"));

        let mut without_config_path = vars.clone();
        without_config_path.remove("SUPPLYTRACE_CONFIG");
        TrackerConfig::load_with_env(None, Some(without_config_path)).unwrap();
    }
}
