use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::agent::Agent;
use crate::agent::Arguments;
use crate::config::SwitchboardConfig;
use crate::descriptor::AgentDescriptor;
use crate::envelope::ResponseEnvelope;
use crate::error::Result;
use crate::history::ExecutionRecord;
use crate::history::HistorySummary;
use crate::registry::AgentRegistry;
use crate::router::Router;

/// One entry of an [`Dispatcher::execute_multiple`] batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(alias = "agent_name")]
    pub agent: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl AgentRequest {
    /// Request for `agent` with the given arguments.
    pub fn new(agent: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            agent: agent.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStatus {
    pub registered_agents_count: usize,
    pub execution_history_count: usize,
    pub history_capacity: usize,
    pub available_agents: Vec<String>,
}

/// Routing, fan-out, and introspection layered over an [`AgentRegistry`].
///
/// Holds no per-call state; everything persistent lives in the registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: AgentRegistry,
    router: Router,
}

impl Dispatcher {
    /// Layer `router` over `registry`. Clones of the registry stay shared.
    pub fn new(registry: AgentRegistry, router: Router) -> Self {
        Self { registry, router }
    }

    /// Empty registry plus the routing rules declared in `config`.
    pub fn from_config(config: &SwitchboardConfig) -> Result<Self> {
        let router = Router::new(config.routing_rules()?);
        Ok(Self::new(AgentRegistry::from_config(config), router))
    }

    /// Underlying agent table and history.
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Ordered routing rules used by [`Self::smart_route`].
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register an agent with the underlying registry; see
    /// [`AgentRegistry::register`] for the duplicate policy.
    pub fn register(
        &self,
        descriptor: AgentDescriptor,
        agent: Arc<dyn Agent>,
    ) -> Result<Option<AgentDescriptor>> {
        self.registry.register(descriptor, agent)
    }

    /// Invoke one agent by name. Never fails; see [`AgentRegistry::invoke`].
    pub async fn execute(&self, agent_name: &str, arguments: Arguments) -> ResponseEnvelope {
        self.registry.invoke(agent_name, arguments).await
    }

    /// Route free text by keyword and run the selected agent with
    /// `{"query": text}`. Unmatched text yields a `not_relevant` help message.
    pub async fn smart_route(&self, text: &str) -> ResponseEnvelope {
        let Some(target) = self.router.route(text) else {
            info!(input_len = text.len(), "no routing rule matched");
            let mut data = Map::new();
            data.insert(
                "available_agents".to_string(),
                Value::from(self.registry.agent_names()),
            );
            return ResponseEnvelope::not_relevant(self.help_message()).with_data(data);
        };

        debug!(agent = target, "routing request");
        let mut arguments = Arguments::new();
        arguments.insert("query".to_string(), Value::from(text));
        self.execute(target, arguments).await
    }

    /// Run every request concurrently; results line up with the input order.
    /// A failing request never cancels or affects its siblings.
    pub async fn execute_multiple(&self, requests: Vec<AgentRequest>) -> Vec<ResponseEnvelope> {
        let calls = requests
            .into_iter()
            .map(|request| self.registry.invoke_owned(request.agent, request.arguments));
        join_all(calls).await
    }

    /// Ping every registered agent and summarize. Unhealthy agents are listed
    /// in the report; the check itself still succeeds.
    pub async fn health_check(&self) -> ResponseEnvelope {
        let names = self.registry.agent_names();
        let probes = names.iter().map(|name| self.registry.ping(name));
        let outcomes = join_all(probes).await;

        let mut report = String::new();
        let mut agents = Map::new();
        let mut healthy = 0usize;
        for (name, outcome) in names.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    healthy += 1;
                    let _ = writeln!(report, "✓ {name}");
                    agents.insert(name.clone(), Value::from("ok"));
                }
                Err(err) => {
                    let _ = writeln!(report, "✗ {name}: {err}");
                    agents.insert(name.clone(), Value::from(err.to_string()));
                }
            }
        }

        let total = names.len();
        let header = if total == 0 {
            "No agents registered.".to_string()
        } else {
            format!("{healthy}/{total} agents healthy")
        };
        info!(healthy, total, "health check complete");

        let mut data = Map::new();
        data.insert("healthy".to_string(), Value::from(healthy));
        data.insert("total".to_string(), Value::from(total));
        data.insert("agents".to_string(), Value::Object(agents));

        let report = format!("{header}\n{report}").trim_end().to_string();
        ResponseEnvelope::success(report).with_data(data)
    }

    /// Most recent records first, at most `limit`.
    pub fn execution_history(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.registry.history().recent(limit)
    }

    /// Aggregate outcomes over the records currently in the history.
    pub fn execution_summary(&self) -> HistorySummary {
        self.registry.history().summary()
    }

    /// Registered agent names mapped to their descriptions.
    pub fn available_agents(&self) -> BTreeMap<String, String> {
        self.registry
            .list_agents()
            .into_iter()
            .map(|descriptor| (descriptor.name, descriptor.description))
            .collect()
    }

    /// Snapshot of the registry size and history usage.
    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            registered_agents_count: self.registry.len(),
            execution_history_count: self.registry.history().len(),
            history_capacity: self.registry.history().capacity(),
            available_agents: self.registry.agent_names(),
        }
    }

    fn help_message(&self) -> String {
        let agents = self.registry.list_agents();
        if agents.is_empty() {
            return "Sorry, I couldn't match your request and no agents are available yet."
                .to_string();
        }
        let mut message =
            String::from("Sorry, I couldn't tell which service you need. I can help with:");
        for descriptor in agents {
            let _ = write!(message, "\n- {descriptor}");
        }
        message
    }
}
