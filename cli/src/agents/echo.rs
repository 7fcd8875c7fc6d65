use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use switchboard_core::Agent;
use switchboard_core::AgentDescriptor;
use switchboard_core::Arguments;
use switchboard_core::ResponseEnvelope;

use super::string_argument;

/// Repeats `message` (or the routed `query`) back to the caller.
#[derive(Debug, Default)]
pub struct EchoAgent;

impl EchoAgent {
    pub const NAME: &'static str = "echo";

    pub fn descriptor() -> AgentDescriptor {
        AgentDescriptor::new(Self::NAME, "Repeats your message back; useful for smoke tests")
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope {
        let message = string_argument(&arguments, &["message", "query"]).unwrap_or("(no message)");

        let mut data = Map::new();
        data.insert("echo".to_string(), Value::from(message));
        ResponseEnvelope::success(format!("Echo: {message}")).with_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn echoes_message_before_query() {
        let result = EchoAgent
            .execute(args(json!({"message": "hi", "query": "echo hi there"})))
            .await;
        assert_eq!(result.report(), "Echo: hi");
        assert_eq!(result.data()["echo"], json!("hi"));

        let routed = EchoAgent.execute(args(json!({"query": "echo hi there"}))).await;
        assert_eq!(routed.report(), "Echo: echo hi there");
    }

    #[tokio::test]
    async fn blank_input_has_placeholder() {
        let result = EchoAgent.execute(args(json!({"message": "   "}))).await;
        assert!(result.is_success());
        assert_eq!(result.report(), "Echo: (no message)");
    }
}
