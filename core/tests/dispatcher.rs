use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;

use switchboard_core::Agent;
use switchboard_core::AgentDescriptor;
use switchboard_core::AgentRegistry;
use switchboard_core::AgentRequest;
use switchboard_core::Arguments;
use switchboard_core::Dispatcher;
use switchboard_core::DuplicatePolicy;
use switchboard_core::FnAgent;
use switchboard_core::ResponseEnvelope;
use switchboard_core::Result;
use switchboard_core::Router;
use switchboard_core::RoutingRule;
use switchboard_core::Status;
use switchboard_core::SwitchboardError;

/// Sleeps for `delay_ms` (taken from the arguments) before echoing it back.
struct Delayed;

#[async_trait]
impl Agent for Delayed {
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope {
        let delay = arguments
            .get("delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(delay)).await;
        ResponseEnvelope::success(format!("slept {delay}ms"))
    }
}

struct Panicking;

#[async_trait]
impl Agent for Panicking {
    async fn execute(&self, _arguments: Arguments) -> ResponseEnvelope {
        panic!("handler bug");
    }
}

struct Stuck;

#[async_trait]
impl Agent for Stuck {
    async fn execute(&self, _arguments: Arguments) -> ResponseEnvelope {
        std::future::pending::<()>().await;
        ResponseEnvelope::success("unreachable")
    }
}

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl Agent for Counting {
    async fn execute(&self, _arguments: Arguments) -> ResponseEnvelope {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseEnvelope::success(format!("call {call}"))
    }
}

struct Unhealthy;

#[async_trait]
impl Agent for Unhealthy {
    async fn execute(&self, _arguments: Arguments) -> ResponseEnvelope {
        ResponseEnvelope::error("upstream offline")
    }

    async fn ping(&self) -> Result<()> {
        Err(SwitchboardError::Unhealthy("upstream offline".to_string()))
    }
}

/// Never answers a health probe.
struct Unresponsive;

#[async_trait]
impl Agent for Unresponsive {
    async fn execute(&self, _arguments: Arguments) -> ResponseEnvelope {
        ResponseEnvelope::success("still here")
    }

    async fn ping(&self) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn weather_router() -> Router {
    Router::new(vec![
        RoutingRule::new(["weather", "天氣"], "weather").expect("weather rule"),
    ])
}

fn register(dispatcher: &Dispatcher, name: &str, agent: Arc<dyn Agent>) {
    dispatcher
        .register(AgentDescriptor::new(name, format!("{name} agent")), agent)
        .expect("register agent");
}

#[tokio::test]
async fn smart_route_selects_weather_agent() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), weather_router());
    let weather = FnAgent::new(|arguments: Arguments| async move {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok::<_, String>(json!({"status": "success", "report": format!("forecast for {query}")}))
    });
    register(&dispatcher, "weather", Arc::new(weather));

    let routed = dispatcher.smart_route("台北天氣如何？").await;
    assert_eq!(routed.status(), Status::Success);
    assert_eq!(routed.report(), "forecast for 台北天氣如何？");

    let unmatched = dispatcher.smart_route("asdkjasdkj").await;
    assert_eq!(unmatched.status(), Status::NotRelevant);
    assert!(unmatched.report().contains("weather: weather agent"));
}

#[tokio::test]
async fn invoke_never_propagates_handler_faults() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), Router::default());
    register(&dispatcher, "broken", Arc::new(Panicking));
    register(&dispatcher, "delayed", Arc::new(Delayed));

    let broken = dispatcher.execute("broken", Arguments::new()).await;
    assert_eq!(broken.status(), Status::Error);
    assert!(!broken.error_message().contains("handler bug"));

    // The registry keeps serving other agents after a fault.
    let healthy = dispatcher
        .execute("delayed", args(json!({"delay_ms": 1})))
        .await;
    assert_eq!(healthy.status(), Status::Success);
}

#[tokio::test]
async fn execute_multiple_preserves_input_order() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), Router::default());
    register(&dispatcher, "delayed", Arc::new(Delayed));
    register(&dispatcher, "broken", Arc::new(Panicking));

    let requests = vec![
        AgentRequest::new("delayed", args(json!({"delay_ms": 60}))),
        AgentRequest::new("broken", Arguments::new()),
        AgentRequest::new("missing", Arguments::new()),
        AgentRequest::new("delayed", args(json!({"delay_ms": 5}))),
    ];
    let results = dispatcher.execute_multiple(requests).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].report(), "slept 60ms");
    assert_eq!(results[1].status(), Status::Error);
    assert_eq!(results[2].error_message(), "agent not found: missing");
    assert_eq!(results[3].report(), "slept 5ms");

    // The short request finished first even though it was submitted last.
    let history = dispatcher.execution_history(10);
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].result.report(), "slept 60ms");
}

#[tokio::test]
async fn execute_multiple_runs_concurrently() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), Router::default());
    register(&dispatcher, "delayed", Arc::new(Delayed));

    let requests = (0..8)
        .map(|_| AgentRequest::new("delayed", args(json!({"delay_ms": 200}))))
        .collect();
    let started = std::time::Instant::now();
    let results = dispatcher.execute_multiple(requests).await;

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(ResponseEnvelope::is_success));
    assert!(
        started.elapsed() < Duration::from_millis(1_000),
        "batch took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn history_returns_most_recent_first_within_capacity() {
    let registry = AgentRegistry::with_options(8, DuplicatePolicy::Replace, None);
    let dispatcher = Dispatcher::new(registry, Router::default());
    register(
        &dispatcher,
        "counter",
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
        }),
    );

    for _ in 0..10 {
        dispatcher.execute("counter", Arguments::new()).await;
    }

    let recent = dispatcher.execution_history(5);
    let reports: Vec<&str> = recent.iter().map(|record| record.result.report()).collect();
    assert_eq!(reports, vec!["call 10", "call 9", "call 8", "call 7", "call 6"]);

    assert_eq!(dispatcher.execution_history(100).len(), 8);
    assert_eq!(dispatcher.status().execution_history_count, 8);
}

#[tokio::test]
async fn stuck_agent_does_not_block_others() {
    let registry = AgentRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone(), Router::default());
    register(&dispatcher, "stuck", Arc::new(Stuck));
    for name in ["alpha", "bravo", "charlie"] {
        register(&dispatcher, name, Arc::new(Delayed));
    }

    let stuck = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.invoke("stuck", Arguments::new()).await })
    };
    let others: Vec<_> = ["alpha", "bravo", "charlie"]
        .into_iter()
        .map(|name| {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .invoke(name, args(json!({"delay_ms": 10})))
                    .await
            })
        })
        .collect();

    let finished = tokio::time::timeout(Duration::from_secs(5), futures::future::join_all(others))
        .await
        .expect("non-blocked agents should finish");
    for result in finished {
        assert_eq!(result.expect("task joined").status(), Status::Success);
    }

    assert_eq!(registry.history().len(), 3);
    assert!(!stuck.is_finished());
    stuck.abort();
}

#[tokio::test]
async fn abandoned_invocation_still_completes_and_is_recorded() {
    let registry = AgentRegistry::new();
    registry
        .register(AgentDescriptor::new("delayed", "delayed agent"), Arc::new(Delayed))
        .expect("register agent");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        registry.invoke("delayed", args(json!({"delay_ms": 50}))),
    )
    .await;
    assert!(abandoned.is_err(), "caller should have stopped waiting");
    assert!(registry.history().is_empty());

    tokio::time::sleep(Duration::from_millis(150)).await;
    let history = registry.history().recent(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].agent_name, "delayed");
    assert_eq!(history[0].result.status(), Status::Success);
    assert_eq!(history[0].result.report(), "slept 50ms");
}

#[tokio::test]
async fn health_check_bounds_unresponsive_probes() {
    let config = switchboard_core::SwitchboardConfig {
        ping_timeout_ms: 20,
        ..Default::default()
    };
    let dispatcher = Dispatcher::from_config(&config).expect("build dispatcher");
    register(&dispatcher, "delayed", Arc::new(Delayed));
    register(&dispatcher, "unresponsive", Arc::new(Unresponsive));

    let health = tokio::time::timeout(Duration::from_secs(5), dispatcher.health_check())
        .await
        .expect("health check should not hang");
    assert_eq!(health.status(), Status::Success);
    assert_eq!(health.data()["healthy"], json!(1));
    assert!(health.report().contains("✗ unresponsive"));
    assert!(health.report().contains("timed out after 20ms"));
}

#[tokio::test]
async fn health_check_reports_each_agent() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), Router::default());
    register(&dispatcher, "delayed", Arc::new(Delayed));
    register(&dispatcher, "offline", Arc::new(Unhealthy));

    let health = dispatcher.health_check().await;
    assert_eq!(health.status(), Status::Success);
    assert_eq!(health.data()["healthy"], json!(1));
    assert_eq!(health.data()["total"], json!(2));
    assert_eq!(health.data()["agents"]["delayed"], json!("ok"));
    assert!(health.report().starts_with("1/2 agents healthy"));
    assert!(health.report().contains("✗ offline"));
}

#[test]
fn available_agents_is_stable_without_registration() {
    let dispatcher = Dispatcher::new(AgentRegistry::new(), Router::default());
    register(&dispatcher, "weather", Arc::new(Delayed));
    register(&dispatcher, "legal", Arc::new(Delayed));

    let first = dispatcher.available_agents();
    let second = dispatcher.available_agents();
    assert_eq!(first, second);
    assert_eq!(first.get("legal").map(String::as_str), Some("legal agent"));
}

#[tokio::test]
async fn dispatcher_from_config_uses_routing_and_policy() {
    let config: switchboard_core::SwitchboardConfig = serde_yaml::from_str(
        "history_capacity: 3\nduplicate_policy: reject\nrouting:\n  - keywords: [weather]\n    target: weather\n",
    )
    .expect("parse config");
    let dispatcher = Dispatcher::from_config(&config).expect("build dispatcher");
    register(&dispatcher, "weather", Arc::new(Delayed));

    let err = dispatcher
        .register(AgentDescriptor::new("weather", "again"), Arc::new(Delayed))
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::DuplicateRegistration(_)));
    assert_eq!(dispatcher.router().rules().len(), 1);
    assert_eq!(dispatcher.status().history_capacity, 3);
}
