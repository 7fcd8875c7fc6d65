use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::SwitchboardError;

/// Name and human-readable summary an agent is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn validate(&self) -> Result<()> {
        validate_agent_name(&self.name)
    }
}

impl std::fmt::Display for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

pub(crate) fn validate_agent_name(name: &str) -> Result<()> {
    #[allow(clippy::expect_used)]
    static NAME_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]{1,63}$").expect("compiled name regex"));
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SwitchboardError::InvalidName {
            name: name.to_string(),
            reason: "name must start with a lowercase letter, include only lowercase letters, digits, hyphen, or underscore, and be 2-64 characters long".to_string(),
        })
    }
}
