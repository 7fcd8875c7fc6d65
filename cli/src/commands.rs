use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde_json::Value;
use serde_json::json;
use switchboard_core::AgentRequest;
use switchboard_core::Arguments;
use switchboard_core::Dispatcher;
use switchboard_core::ExecutionRecord;
use switchboard_core::ResponseEnvelope;
use switchboard_core::Status;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parse `key=value`; the value is JSON when it parses as JSON, else a string.
pub fn parse_argument(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("argument key cannot be empty in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

/// List available agents and routing rules
pub fn list_agents(dispatcher: &Dispatcher, format: OutputFormat) -> Result<()> {
    let agents = dispatcher.available_agents();

    match format {
        OutputFormat::Json => {
            let output = json!({
                "agents": agents,
                "routing": dispatcher.router().rules(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if agents.is_empty() {
                println!("{}", "No agents registered.".yellow());
                return Ok(());
            }

            println!("{}", "Available agents:".blue().bold());
            for (name, description) in &agents {
                println!("  {}  {description}", name.cyan());
            }

            let rules = dispatcher.router().rules();
            if !rules.is_empty() {
                println!("\n{}", "Routing rules (first match wins):".blue().bold());
                for (index, rule) in rules.iter().enumerate() {
                    println!(
                        "  {}. [{}] -> {}",
                        index + 1,
                        rule.keywords().join(", "),
                        rule.target_agent()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Run a specific agent
pub async fn run_agent(
    dispatcher: &Dispatcher,
    agent_name: &str,
    args: Vec<(String, Value)>,
    format: OutputFormat,
) -> Result<()> {
    let arguments: Arguments = args.into_iter().collect();
    let result = dispatcher.execute(agent_name, arguments).await;
    print_envelope(&result, format)?;
    fail_on_error(&result)
}

/// Route free text through the keyword rules
pub async fn route_text(dispatcher: &Dispatcher, text: &str, format: OutputFormat) -> Result<()> {
    let result = dispatcher.smart_route(text).await;
    print_envelope(&result, format)?;
    fail_on_error(&result)
}

/// Run every request in a JSON file concurrently
pub async fn run_batch(dispatcher: &Dispatcher, path: &Path, format: OutputFormat) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let requests: Vec<AgentRequest> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of requests", path.display()))?;

    let agents: Vec<String> = requests.iter().map(|request| request.agent.clone()).collect();
    let results = dispatcher.execute_multiple(requests).await;

    match format {
        OutputFormat::Json => {
            let output: Vec<Value> = agents
                .iter()
                .zip(&results)
                .map(|(agent, result)| json!({"agent": agent, "result": result}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for (index, (agent, result)) in agents.iter().zip(&results).enumerate() {
                println!(
                    "[{}] {} {}: {}",
                    index + 1,
                    agent.cyan(),
                    status_label(result.status()),
                    result.message()
                );
            }
        }
    }

    Ok(())
}

/// Check agent health
pub async fn check_health(dispatcher: &Dispatcher) -> Result<()> {
    let result = dispatcher.health_check().await;
    println!("{}", result.report());
    Ok(())
}

/// Line-oriented conversation over stdin; each line is smart-routed.
pub async fn chat(dispatcher: &Dispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ChatCommand::parse(line) {
            ChatCommand::Quit => break,
            ChatCommand::History(limit) => {
                let history = dispatcher.execution_history(limit);
                if history.is_empty() {
                    println!("No executions yet.");
                }
                for record in &history {
                    println!("{}", format_record(record));
                }
            }
            ChatCommand::Status => {
                let status = dispatcher.status();
                println!("Registered agents: {}", status.registered_agents_count);
                println!(
                    "Execution history: {}/{}",
                    status.execution_history_count, status.history_capacity
                );
                println!("Available agents: {}", status.available_agents.join(", "));
                let summary = dispatcher.execution_summary();
                println!(
                    "Outcomes: {} succeeded, {} failed, {} not relevant (avg {}ms)",
                    summary.succeeded,
                    summary.failed,
                    summary.not_relevant,
                    summary.average_duration_ms
                );
            }
            ChatCommand::Health => {
                println!("{}", dispatcher.health_check().await.report());
            }
            ChatCommand::Message(text) => {
                let result = dispatcher.smart_route(text).await;
                println!("{}", reply_text(&result));
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Quit,
    History(usize),
    Status,
    Health,
    Message(&'a str),
}

impl<'a> ChatCommand<'a> {
    fn parse(line: &'a str) -> Self {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/quit" | "/exit") => Self::Quit,
            Some("/status") => Self::Status,
            Some("/health") => Self::Health,
            Some("/history") => Self::History(
                parts
                    .next()
                    .and_then(|limit| limit.parse().ok())
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            ),
            _ => Self::Message(line),
        }
    }
}

/// What a chat user sees for an envelope.
fn reply_text(result: &ResponseEnvelope) -> String {
    match result.status() {
        Status::Success | Status::NotRelevant => result.report().to_string(),
        Status::Error => format!(
            "Sorry, something went wrong handling your request: {}",
            result.error_message()
        ),
    }
}

fn format_record(record: &ExecutionRecord) -> String {
    format!(
        "{} {} {} ({}ms)",
        record.started_at.format("%Y-%m-%d %H:%M:%S"),
        record.agent_name,
        record.status(),
        record.duration_ms
    )
}

fn status_label(status: Status) -> String {
    match status {
        Status::Success => status.green().to_string(),
        Status::Error => status.red().to_string(),
        Status::NotRelevant => status.yellow().to_string(),
    }
}

fn print_envelope(result: &ResponseEnvelope, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => match result.status() {
            Status::Success | Status::NotRelevant => {
                println!("{}", result.report());
                if !result.data().is_empty() {
                    println!("{}", serde_json::to_string_pretty(result.data())?);
                }
            }
            Status::Error => {}
        },
    }
    Ok(())
}

fn fail_on_error(result: &ResponseEnvelope) -> Result<()> {
    match result.status() {
        Status::Error => Err(anyhow!("{}", result.error_message())),
        Status::Success | Status::NotRelevant => Ok(()),
    }
}
