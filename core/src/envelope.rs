use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Keys that belong to the envelope itself and are never carried in `data`.
pub const RESERVED_DATA_KEYS: [&str; 3] = ["status", "report", "error_message"];

const DEFAULT_ERROR_MESSAGE: &str = "unknown error";
const DEFAULT_SUCCESS_REPORT: &str = "Request completed.";
const DEFAULT_NOT_RELEVANT: &str = "This request is not relevant to the selected agent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
    NotRelevant,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
            Status::NotRelevant => "not_relevant",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result of an agent invocation.
///
/// Envelopes are immutable once built: `report` is populated for
/// [`Status::Success`] and [`Status::NotRelevant`], `error_message` only for
/// [`Status::Error`]. Callers must branch on [`ResponseEnvelope::status`]
/// before reading either text field.
///
/// Deserialization goes through the same constructors, so a decoded envelope
/// upholds the same invariants as one built in process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct ResponseEnvelope {
    status: Status,
    report: String,
    error_message: String,
    data: Map<String, Value>,
}

/// Wire shape accepted by [`ResponseEnvelope`]'s `Deserialize` impl.
#[derive(Deserialize)]
struct RawEnvelope {
    status: Status,
    #[serde(default)]
    report: String,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    data: Map<String, Value>,
}

impl TryFrom<RawEnvelope> for ResponseEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if let Some(key) = raw
            .data
            .keys()
            .find(|key| RESERVED_DATA_KEYS.contains(&key.as_str()))
        {
            return Err(format!("`{key}` is reserved and cannot appear in data"));
        }

        let envelope = match raw.status {
            Status::Error if !raw.report.is_empty() => {
                return Err("an error envelope cannot carry a report".to_string());
            }
            Status::Success | Status::NotRelevant if !raw.error_message.is_empty() => {
                return Err(format!(
                    "a {} envelope cannot carry an error_message",
                    raw.status
                ));
            }
            Status::Error => Self::error(raw.error_message),
            Status::Success => Self::success(raw.report),
            Status::NotRelevant => Self::not_relevant(raw.report),
        };
        Ok(envelope.with_data(raw.data))
    }
}

impl ResponseEnvelope {
    /// A blank report is replaced with a generic completion message.
    pub fn success(report: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            report: text_or(report.into(), DEFAULT_SUCCESS_REPORT),
            error_message: String::new(),
            data: Map::new(),
        }
    }

    /// A blank message becomes `"unknown error"`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            report: String::new(),
            error_message: text_or(message.into(), DEFAULT_ERROR_MESSAGE),
            data: Map::new(),
        }
    }

    pub fn not_relevant(message: impl Into<String>) -> Self {
        Self {
            status: Status::NotRelevant,
            report: text_or(message.into(), DEFAULT_NOT_RELEVANT),
            error_message: String::new(),
            data: Map::new(),
        }
    }

    /// Attach a structured payload; reserved keys are dropped.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data
            .into_iter()
            .filter(|(key, _)| !RESERVED_DATA_KEYS.contains(&key.as_str()))
            .collect();
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The populated text field for the current status.
    pub fn message(&self) -> &str {
        match self.status {
            Status::Error => &self.error_message,
            Status::Success | Status::NotRelevant => &self.report,
        }
    }

    /// Flatten into the loose mapping older handlers produced: the three
    /// envelope fields plus every `data` entry at the top level.
    pub fn to_flat_map(&self) -> Map<String, Value> {
        let mut flat = Map::new();
        flat.insert("status".to_string(), Value::from(self.status.as_str()));
        flat.insert("report".to_string(), Value::from(self.report.clone()));
        flat.insert(
            "error_message".to_string(),
            Value::from(self.error_message.clone()),
        );
        for (key, value) in &self.data {
            flat.insert(key.clone(), value.clone());
        }
        flat
    }

    /// Interpret a loosely-typed handler result.
    ///
    /// Objects carrying a recognised `status` map onto the matching envelope
    /// with the remaining keys as `data`; anything else is stringified into a
    /// success report.
    pub fn from_legacy(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return Self::success(render_scalar(&value));
        };

        let status = object.get("status").and_then(Value::as_str).map(str::to_owned);
        let take_text = |object: &mut Map<String, Value>, key: &str| -> String {
            object
                .remove(key)
                .map(|value| render_scalar(&value))
                .unwrap_or_default()
        };

        match status.as_deref() {
            Some("success") => {
                let report = take_text(&mut object, "report");
                Self::success(report).with_data(object)
            }
            Some("error") => {
                let message = take_text(&mut object, "error_message");
                Self::error(message).with_data(object)
            }
            Some("not_relevant") => {
                let report = take_text(&mut object, "report");
                Self::not_relevant(report).with_data(object)
            }
            _ => Self::success(Value::Object(object).to_string()),
        }
    }
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self::not_relevant(DEFAULT_NOT_RELEVANT)
    }
}

fn text_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
