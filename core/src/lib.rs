//! Agent registry and dispatch primitives (contract, registry, router, dispatcher, history).

mod agent;
mod config;
mod descriptor;
mod dispatcher;
mod envelope;
mod error;
mod history;
mod registry;
mod router;
mod telemetry;

pub use agent::Agent;
pub use agent::Arguments;
pub use agent::FnAgent;
pub use agent::require_params;
pub use config::DuplicatePolicy;
pub use config::RoutingRuleConfig;
pub use config::SwitchboardConfig;
pub use descriptor::AgentDescriptor;
pub use dispatcher::AgentRequest;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherStatus;
pub use envelope::RESERVED_DATA_KEYS;
pub use envelope::ResponseEnvelope;
pub use envelope::Status;
pub use error::Result;
pub use error::SwitchboardError;
pub use history::AgentStats;
pub use history::ExecutionHistory;
pub use history::ExecutionRecord;
pub use history::HistorySummary;
pub use registry::AgentRegistry;
pub use router::Router;
pub use router::RoutingRule;
