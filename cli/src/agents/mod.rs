//! Demo agents shipped with the binary and the keyword rules that reach them.

mod calculator;
mod clock;
mod echo;

pub use calculator::CalculatorAgent;
pub use clock::ClockAgent;
pub use echo::EchoAgent;

use std::sync::Arc;

use serde_json::Value;
use switchboard_core::Agent;
use switchboard_core::AgentDescriptor;
use switchboard_core::Arguments;
use switchboard_core::RoutingRule;

pub fn builtin_agents() -> Vec<(AgentDescriptor, Arc<dyn Agent>)> {
    vec![
        (CalculatorAgent::descriptor(), Arc::new(CalculatorAgent)),
        (ClockAgent::descriptor(), Arc::new(ClockAgent)),
        (EchoAgent::descriptor(), Arc::new(EchoAgent)),
    ]
}

/// Rules are checked in order; the first match wins.
pub fn builtin_routing_rules() -> switchboard_core::Result<Vec<RoutingRule>> {
    Ok(vec![
        RoutingRule::new(["計算", "calculate", "calc", "算"], "calculator")?,
        RoutingRule::new(["時間", "幾點", "time", "clock"], "clock")?,
        RoutingRule::new(["echo", "範例", "example"], "echo")?,
    ])
}

/// First non-blank string among `keys`.
fn string_argument<'a>(arguments: &'a Arguments, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| arguments.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}
