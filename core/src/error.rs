use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = SwitchboardError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("agent `{0}` is already registered")]
    DuplicateRegistration(String),

    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("invalid agent name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid routing rule for `{target}`: {reason}")]
    InvalidRoutingRule { target: String, reason: String },

    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("agent reported unhealthy: {0}")]
    Unhealthy(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error while reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl SwitchboardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_rule(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRoutingRule {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
