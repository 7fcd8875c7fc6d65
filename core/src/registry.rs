use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::agent::Agent;
use crate::agent::Arguments;
use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::config::DEFAULT_PING_TIMEOUT_MS;
use crate::config::DuplicatePolicy;
use crate::config::SwitchboardConfig;
use crate::descriptor::AgentDescriptor;
use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::error::SwitchboardError;
use crate::history::ExecutionHistory;
use crate::history::ExecutionRecord;
use crate::telemetry;

#[derive(Clone)]
struct RegisteredAgent {
    descriptor: AgentDescriptor,
    agent: Arc<dyn Agent>,
}

struct RegistryInner {
    agents: RwLock<BTreeMap<String, RegisteredAgent>>,
    history: ExecutionHistory,
    duplicate_policy: DuplicatePolicy,
    invoke_timeout: Option<Duration>,
    ping_timeout: Duration,
}

/// Catalog of agents keyed by name, with isolated invocation.
///
/// The handle is cheap to clone; clones share the same agent table and
/// execution history. Table and history locks are only held for the map or
/// buffer mutation itself, never across an agent's `execute`.
#[derive(Clone)]
pub struct AgentRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agent_names())
            .field("history_len", &self.inner.history.len())
            .field("duplicate_policy", &self.inner.duplicate_policy)
            .field("invoke_timeout", &self.inner.invoke_timeout)
            .field("ping_timeout", &self.inner.ping_timeout)
            .finish()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    /// Empty registry with the default history capacity, the `replace`
    /// duplicate policy, and no invocation timeout.
    pub fn new() -> Self {
        Self::with_options(DEFAULT_HISTORY_CAPACITY, DuplicatePolicy::default(), None)
    }

    /// Empty registry sized and configured from `config`.
    pub fn from_config(config: &SwitchboardConfig) -> Self {
        Self::build(
            config.history_capacity,
            config.duplicate_policy,
            config.invoke_timeout(),
            config.ping_timeout(),
        )
    }

    /// Empty registry with explicit settings and the default ping deadline.
    pub fn with_options(
        history_capacity: usize,
        duplicate_policy: DuplicatePolicy,
        invoke_timeout: Option<Duration>,
    ) -> Self {
        Self::build(
            history_capacity,
            duplicate_policy,
            invoke_timeout,
            Duration::from_millis(DEFAULT_PING_TIMEOUT_MS),
        )
    }

    fn build(
        history_capacity: usize,
        duplicate_policy: DuplicatePolicy,
        invoke_timeout: Option<Duration>,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                agents: RwLock::new(BTreeMap::new()),
                history: ExecutionHistory::new(history_capacity),
                duplicate_policy,
                invoke_timeout,
                ping_timeout,
            }),
        }
    }

    /// Register `agent` under `descriptor.name`.
    ///
    /// Returns the descriptor that was replaced, if any. Under
    /// [`DuplicatePolicy::Reject`] a taken name fails instead.
    pub fn register(
        &self,
        descriptor: AgentDescriptor,
        agent: Arc<dyn Agent>,
    ) -> Result<Option<AgentDescriptor>> {
        descriptor.validate()?;

        let mut agents = self
            .inner
            .agents
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if agents.contains_key(descriptor.name()) {
            match self.inner.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(SwitchboardError::DuplicateRegistration(
                        descriptor.name.clone(),
                    ));
                }
                DuplicatePolicy::Replace => {
                    warn!(agent = descriptor.name(), "agent already registered; replacing");
                }
            }
        }

        let name = descriptor.name.clone();
        info!(agent = %name, description = descriptor.description(), "registered agent");
        let previous = agents.insert(name, RegisteredAgent { descriptor, agent });
        Ok(previous.map(|entry| entry.descriptor))
    }

    /// Convenience over [`Self::register`] for a concrete agent value.
    pub fn register_agent<A>(
        &self,
        descriptor: AgentDescriptor,
        agent: A,
    ) -> Result<Option<AgentDescriptor>>
    where
        A: Agent + 'static,
    {
        self.register(descriptor, Arc::new(agent))
    }

    /// Remove `name`; returns whether an agent was registered under it.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .inner
            .agents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            info!(agent = name, "unregistered agent");
        }
        removed
    }

    /// Shared handle to the agent registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| Arc::clone(&entry.agent))
    }

    /// Descriptor the agent was registered with.
    pub fn descriptor(&self, name: &str) -> Option<AgentDescriptor> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| entry.descriptor.clone())
    }

    /// Whether an agent is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered descriptors ordered by name.
    pub fn list_agents(&self) -> Vec<AgentDescriptor> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Registered names in sorted order.
    pub fn agent_names(&self) -> Vec<String> {
        self.inner
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Execution history shared by every clone of this registry.
    pub fn history(&self) -> &ExecutionHistory {
        &self.inner.history
    }

    /// Run an agent by name and record the attempt.
    ///
    /// Never fails: unknown names, panics, and timeouts all come back as
    /// `status=error` envelopes. The run happens on its own task, so it
    /// completes and is recorded even if the caller stops waiting.
    pub async fn invoke(&self, name: &str, arguments: Arguments) -> ResponseEnvelope {
        let Some(agent) = self.lookup(name) else {
            warn!(agent = name, "invocation of unknown agent");
            let result = ResponseEnvelope::error(SwitchboardError::NotFound(name.to_string()).to_string());
            self.inner
                .record(name.to_string(), arguments, result.clone(), Utc::now(), Duration::ZERO);
            return result;
        };

        let inner = Arc::clone(&self.inner);
        let agent_name = name.to_string();
        let task = tokio::spawn(async move { inner.run_and_record(agent_name, agent, arguments).await });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(agent = name, error = %err, "agent task did not complete");
                ResponseEnvelope::error(internal_error_message(name))
            }
        }
    }

    /// Owned-argument form of [`Self::invoke`] for fan-out futures.
    pub(crate) async fn invoke_owned(&self, name: String, arguments: Arguments) -> ResponseEnvelope {
        self.invoke(&name, arguments).await
    }

    /// Probe an agent's liveness with the same isolation as [`Self::invoke`].
    ///
    /// Every probe is bounded by the ping deadline, so an agent that never
    /// answers is reported unhealthy. Probes are not recorded in the execution
    /// history.
    pub async fn ping(&self, name: &str) -> Result<()> {
        let agent = self
            .lookup(name)
            .ok_or_else(|| SwitchboardError::NotFound(name.to_string()))?;

        let limit = self.inner.ping_timeout;
        let probe = AssertUnwindSafe(agent.ping()).catch_unwind();
        let outcome = tokio::time::timeout(limit, probe)
            .await
            .map_err(|_| SwitchboardError::Unhealthy(timeout_message(name, limit)))?;

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                error!(agent = name, panic = %panic_message(payload.as_ref()), "agent faulted during ping");
                Err(SwitchboardError::Unhealthy(internal_error_message(name)))
            }
        }
    }
}

impl RegistryInner {
    async fn run_and_record(
        &self,
        name: String,
        agent: Arc<dyn Agent>,
        arguments: Arguments,
    ) -> ResponseEnvelope {
        let started_at = Utc::now();
        let started = Instant::now();
        debug!(agent = %name, "invoking agent");

        let call = AssertUnwindSafe(agent.execute(arguments.clone())).catch_unwind();
        let outcome = match self.invoke_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| limit),
            None => Ok(call.await),
        };

        let result = match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(payload)) => {
                error!(
                    agent = %name,
                    panic = %panic_message(payload.as_ref()),
                    "agent faulted during execution"
                );
                ResponseEnvelope::error(internal_error_message(&name))
            }
            Err(limit) => {
                warn!(agent = %name, timeout_ms = telemetry::duration_ms(limit), "agent timed out");
                ResponseEnvelope::error(timeout_message(&name, limit))
            }
        };

        self.record(name, arguments, result.clone(), started_at, started.elapsed());
        result
    }

    fn record(
        &self,
        agent_name: String,
        arguments: Arguments,
        result: ResponseEnvelope,
        started_at: chrono::DateTime<Utc>,
        duration: Duration,
    ) {
        telemetry::record_invocation(&agent_name, duration, result.status());
        self.history.push(ExecutionRecord {
            agent_name,
            arguments,
            result,
            started_at,
            duration_ms: telemetry::duration_ms(duration),
        });
    }
}

fn internal_error_message(name: &str) -> String {
    format!("agent {name} failed with an internal error")
}

fn timeout_message(name: &str, limit: Duration) -> String {
    format!(
        "agent {name} timed out after {}ms",
        telemetry::duration_ms(limit)
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
