//! Configuration for the supplytrace binary

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use supplytrace_kernel::{
    EnumeratedPolicy, HybridLogicalClock, Identity, JournalTarget, KnownCallers, NodeId,
    ProvisioningPlan, RoleGrant, RoleParseError, SyncMode, Tracker, TrackerResult,
};

/// Main tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Identity holding ADMIN; fixed once the journal has a genesis record
    #[serde(default = "default_admin")]
    pub admin: String,

    /// Identity the orchestrator acts under
    #[serde(default = "default_orchestrator")]
    pub orchestrator: String,

    /// Journal configuration
    #[serde(default)]
    pub journal: JournalConfig,

    /// Logical clock configuration
    #[serde(default)]
    pub clock: ClockConfig,

    /// Allowed status and action values
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Allow-list of caller identities; unset trusts every caller
    #[serde(default)]
    pub callers: Option<Vec<String>>,

    /// Role grants applied by `supplytrace provision`
    #[serde(default)]
    pub provisioning: Vec<GrantConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            orchestrator: default_orchestrator(),
            journal: JournalConfig::default(),
            clock: ClockConfig::default(),
            validation: ValidationConfig::default(),
            callers: None,
            provisioning: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Journal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JournalConfig {
    /// In-memory journal; state is lost when the process exits
    Memory,

    /// Single append-only file
    File {
        path: PathBuf,

        #[serde(default)]
        sync: SyncMode,
    },
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig::File {
            path: default_journal_path(),
            sync: SyncMode::default(),
        }
    }
}

impl JournalConfig {
    pub fn target(&self) -> JournalTarget {
        match self {
            JournalConfig::Memory => JournalTarget::Memory(Default::default()),
            JournalConfig::File { path, sync } => JournalTarget::File {
                path: path.clone(),
                sync: *sync,
            },
        }
    }
}

/// Logical clock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_node_id")]
    pub node_id: u16,

    /// Largest forward jump accepted from a replayed timestamp before warning
    #[serde(default = "default_max_drift")]
    pub max_drift_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            max_drift_ms: default_max_drift(),
        }
    }
}

/// Empty lists accept any value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub statuses: Vec<String>,

    #[serde(default)]
    pub actions: Vec<String>,
}

impl ValidationConfig {
    pub fn is_permissive(&self) -> bool {
        self.statuses.is_empty() && self.actions.is_empty()
    }
}

/// One provisioning entry, e.g. `{ role = "distributor", identity = "0xabc" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantConfig {
    pub role: String,
    pub identity: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_admin() -> String {
    "deployer".to_string()
}

fn default_orchestrator() -> String {
    "controller".to_string()
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("supplytrace.journal")
}

fn default_node_id() -> u16 {
    1
}

fn default_max_drift() -> u64 {
    1000
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl TrackerConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `SUPPLYTRACE_`-prefixed environment variables (`__` between
    /// sections, e.g. `SUPPLYTRACE_JOURNAL__PATH`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, None)
    }

    /// `load`, reading variables from `env` instead of the process
    /// environment when given.
    pub fn load_with_env(
        path: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&TrackerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SUPPLYTRACE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder.build()?.try_deserialize()
    }

    pub fn admin_identity(&self) -> Identity {
        Identity::new(&self.admin)
    }

    pub fn orchestrator_identity(&self) -> Identity {
        Identity::new(&self.orchestrator)
    }

    /// The configured grants plus the orchestrator's OPERATOR_CREATE.
    pub fn plan(&self) -> Result<ProvisioningPlan, RoleParseError> {
        let grants = self
            .provisioning
            .iter()
            .map(|g| RoleGrant::parse(&g.role, g.identity.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProvisioningPlan {
            grants,
            orchestrator: Some(self.orchestrator_identity()),
        })
    }

    /// Open (or create) the tracker this configuration describes.
    pub fn open_tracker(&self) -> TrackerResult<Arc<Tracker>> {
        let mut builder = Tracker::builder(self.admin_identity())
            .journal(self.journal.target())
            .clock(HybridLogicalClock::with_max_drift(
                NodeId(self.clock.node_id),
                self.clock.max_drift_ms,
            ));

        if !self.validation.is_permissive() {
            builder = builder.policy(EnumeratedPolicy::new(
                self.validation.statuses.clone(),
                self.validation.actions.clone(),
            ));
        }

        if let Some(callers) = &self.callers {
            builder = builder.verifier(KnownCallers::new(callers.iter().map(Identity::new)));
        }

        builder.open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplytrace_kernel::{ErrorKind, OperationalRole, RoleRegistry};

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.admin, "deployer");
        assert_eq!(config.orchestrator, "controller");
        assert!(matches!(
            config.journal,
            JournalConfig::File { ref path, sync: SyncMode::Immediate } if path == &default_journal_path()
        ));
        assert!(config.validation.is_permissive());
        assert!(config.callers.is_none());
    }

    #[test]
    fn test_clock_defaults() {
        let config = ClockConfig::default();
        assert_eq!(config.node_id, 1);
        assert_eq!(config.max_drift_ms, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supplytrace.toml");
        std::fs::write(
            &path,
            r#"
admin = "0xdeployer"
orchestrator = "0xcontroller"

[journal]
type = "memory"

[validation]
statuses = ["CREATED", "IN_TRANSIT"]

[[provisioning]]
role = "manufacturer"
identity = "0xmaker"

[[provisioning]]
role = "OPERATOR_AUDIT"
identity = "0xregulator"

[logging]
json = true
"#,
        )
        .unwrap();

        let config = TrackerConfig::load(path.to_str()).unwrap();
        assert_eq!(config.admin, "0xdeployer");
        assert!(matches!(config.journal, JournalConfig::Memory));
        assert_eq!(config.validation.statuses.len(), 2);
        assert!(config.validation.actions.is_empty());
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "warn");

        let plan = config.plan().unwrap();
        assert_eq!(plan.grants.len(), 2);
        assert_eq!(plan.grants[0].role, OperationalRole::OperatorCreate);
        assert_eq!(plan.orchestrator, Some(Identity::new("0xcontroller")));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = TrackerConfig::load(Some("/nonexistent/supplytrace")).unwrap();
        assert_eq!(config.admin, "deployer");
    }

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_env_overrides_nested_sections() {
        let config = TrackerConfig::load_with_env(
            None,
            env(&[
                ("SUPPLYTRACE_ADMIN", "0xdeployer"),
                ("SUPPLYTRACE_JOURNAL__TYPE", "memory"),
                ("SUPPLYTRACE_CLOCK__NODE_ID", "7"),
            ]),
        )
        .unwrap();
        assert_eq!(config.admin, "0xdeployer");
        assert!(matches!(config.journal, JournalConfig::Memory));
        assert_eq!(config.clock.node_id, 7);
    }

    #[test]
    fn test_flag_variables_do_not_clash_with_sections() {
        let config = TrackerConfig::load_with_env(
            None,
            env(&[
                ("SUPPLYTRACE_JOURNAL_FILE", "/tmp/flag.journal"),
                ("SUPPLYTRACE_CALLER", "0xmaker"),
                ("SUPPLYTRACE_LOG_LEVEL", "debug"),
                ("SUPPLYTRACE_LOG_JSON", "true"),
            ]),
        )
        .unwrap();
        assert!(matches!(
            config.journal,
            JournalConfig::File { ref path, .. } if path == &default_journal_path()
        ));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_unknown_role_in_plan() {
        let config = TrackerConfig {
            provisioning: vec![GrantConfig {
                role: "warehouse".into(),
                identity: "w".into(),
            }],
            ..Default::default()
        };
        assert!(config.plan().is_err());
    }

    #[test]
    fn test_open_tracker_applies_allow_list() {
        let config = TrackerConfig {
            journal: JournalConfig::Memory,
            callers: Some(vec!["deployer".into()]),
            ..Default::default()
        };
        let tracker = config.open_tracker().unwrap();
        let roles = RoleRegistry::new(tracker);

        roles
            .grant(
                &Identity::new("deployer"),
                OperationalRole::OperatorCreate,
                &Identity::new("maker"),
            )
            .unwrap();
        let err = roles
            .grant(
                &Identity::new("stranger"),
                OperationalRole::OperatorCreate,
                &Identity::new("maker"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
