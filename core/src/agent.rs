use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::error::SwitchboardError;

/// Opaque keyword arguments handed to [`Agent::execute`].
pub type Arguments = Map<String, Value>;

/// Capability every task handler provides.
///
/// Agents are shared process-wide behind an `Arc`, so `execute` must tolerate
/// concurrent and re-entrant calls. Expected failures (network errors, bad
/// input) are reported as [`ResponseEnvelope::error`]; a panic is treated as a
/// handler defect and contained by the registry.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope;

    /// Lightweight liveness probe used by health checks.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Check that every `required` key is present and non-null.
pub fn require_params(arguments: &Arguments, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|key| arguments.get(**key).is_none_or(Value::is_null))
        .map(|key| (*key).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SwitchboardError::MissingParams(missing))
    }
}

/// Adapts a plain async function returning loosely-typed JSON into an agent.
pub struct FnAgent<F> {
    func: F,
}

impl<F> FnAgent<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnAgent<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut, E> Agent for FnAgent<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope {
        match (self.func)(arguments).await {
            Ok(value) => ResponseEnvelope::from_legacy(value),
            Err(err) => ResponseEnvelope::error(format!("function execution failed: {err}")),
        }
    }
}
