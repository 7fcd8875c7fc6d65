//! Command-line transport for the switchboard dispatcher plus the built-in demo agents.

pub mod agents;
pub mod commands;

use anyhow::Context;
use anyhow::Result;
use std::path::Path;
use switchboard_core::AgentRegistry;
use switchboard_core::Dispatcher;
use switchboard_core::Router;
use switchboard_core::SwitchboardConfig;

/// Load configuration and build a dispatcher with the built-in agents registered.
/// Built-in routing rules apply when the configuration declares none.
pub async fn build_dispatcher(config_path: Option<&Path>) -> Result<Dispatcher> {
    let config = SwitchboardConfig::load(config_path)
        .await
        .context("failed to load configuration")?;

    let rules = if config.routing.is_empty() {
        agents::builtin_routing_rules()?
    } else {
        config.routing_rules()?
    };

    let dispatcher = Dispatcher::new(AgentRegistry::from_config(&config), Router::new(rules));
    for (descriptor, agent) in agents::builtin_agents() {
        dispatcher
            .register(descriptor, agent)
            .context("failed to register built-in agent")?;
    }
    Ok(dispatcher)
}
