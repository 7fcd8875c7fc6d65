use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::fs;

use crate::error::Result;
use crate::error::SwitchboardError;
use crate::router::RoutingRule;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 5_000;

const ENV_HISTORY_CAPACITY: &str = "SWITCHBOARD_HISTORY_CAPACITY";
const ENV_INVOKE_TIMEOUT_MS: &str = "SWITCHBOARD_INVOKE_TIMEOUT_MS";
const ENV_DUPLICATE_POLICY: &str = "SWITCHBOARD_DUPLICATE_POLICY";
const ENV_PING_TIMEOUT_MS: &str = "SWITCHBOARD_PING_TIMEOUT_MS";

/// What [`crate::AgentRegistry::register`] does when the name is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Swap in the new agent and log a warning.
    #[default]
    Replace,
    /// Fail with [`SwitchboardError::DuplicateRegistration`].
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = SwitchboardError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "reject" => Ok(Self::Reject),
            other => Err(SwitchboardError::Config(format!(
                "unknown duplicate policy `{other}` (expected `replace` or `reject`)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRuleConfig {
    pub keywords: Vec<String>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    pub history_capacity: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub invoke_timeout_ms: Option<u64>,
    /// Deadline for a single health probe; always applied.
    pub ping_timeout_ms: u64,
    pub routing: Vec<RoutingRuleConfig>,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            duplicate_policy: DuplicatePolicy::default(),
            invoke_timeout_ms: None,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            routing: Vec::new(),
        }
    }
}

impl SwitchboardConfig {
    /// Load configuration from a YAML file, or defaults when no path is given.
    /// Environment overrides are applied in both cases.
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .await
                    .map_err(|err| SwitchboardError::io(path, err))?;
                serde_yaml::from_str(&contents).map_err(|source| SwitchboardError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };

        config.merge_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = lookup(ENV_HISTORY_CAPACITY) {
            self.history_capacity = raw.trim().parse().map_err(|_| {
                SwitchboardError::Config(format!("{ENV_HISTORY_CAPACITY} must be an integer, got `{raw}`"))
            })?;
        }

        if let Some(raw) = lookup(ENV_INVOKE_TIMEOUT_MS) {
            let timeout: u64 = raw.trim().parse().map_err(|_| {
                SwitchboardError::Config(format!("{ENV_INVOKE_TIMEOUT_MS} must be an integer, got `{raw}`"))
            })?;
            self.invoke_timeout_ms = (timeout > 0).then_some(timeout);
        }

        if let Some(raw) = lookup(ENV_PING_TIMEOUT_MS) {
            self.ping_timeout_ms = raw.trim().parse().map_err(|_| {
                SwitchboardError::Config(format!("{ENV_PING_TIMEOUT_MS} must be an integer, got `{raw}`"))
            })?;
        }

        if let Some(raw) = lookup(ENV_DUPLICATE_POLICY) {
            self.duplicate_policy = raw.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(SwitchboardError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.invoke_timeout_ms == Some(0) {
            return Err(SwitchboardError::Config(
                "invoke_timeout_ms must be positive when set".to_string(),
            ));
        }
        if self.ping_timeout_ms == 0 {
            return Err(SwitchboardError::Config(
                "ping_timeout_ms must be positive".to_string(),
            ));
        }
        self.routing_rules().map(|_| ())
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_ms.map(Duration::from_millis)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn routing_rules(&self) -> Result<Vec<RoutingRule>> {
        self.routing
            .iter()
            .map(|rule| RoutingRule::new(rule.keywords.iter().cloned(), rule.target.clone()))
            .collect()
    }
}
