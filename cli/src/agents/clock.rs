use async_trait::async_trait;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use serde_json::Map;
use serde_json::Value;
use switchboard_core::Agent;
use switchboard_core::AgentDescriptor;
use switchboard_core::Arguments;
use switchboard_core::ResponseEnvelope;

use super::string_argument;

const DEFAULT_CITY: &str = "Taipei";

/// (canonical name, aliases, UTC offset in hours). Offsets ignore daylight saving.
const CITIES: &[(&str, &[&str], i32)] = &[
    ("Taipei", &["taipei", "台北", "臺北"], 8),
    ("Tokyo", &["tokyo", "東京"], 9),
    ("Seoul", &["seoul", "首爾"], 9),
    ("Beijing", &["beijing", "北京"], 8),
    ("Hong Kong", &["hong kong", "香港"], 8),
    ("Singapore", &["singapore", "新加坡"], 8),
    ("New York", &["new york", "紐約"], -5),
    ("Los Angeles", &["los angeles", "洛杉磯"], -8),
    ("London", &["london", "倫敦"], 0),
    ("Paris", &["paris", "巴黎"], 1),
];

/// Reports the current local time for a handful of well-known cities.
#[derive(Debug, Default)]
pub struct ClockAgent;

impl ClockAgent {
    pub const NAME: &'static str = "clock";

    pub fn descriptor() -> AgentDescriptor {
        AgentDescriptor::new(Self::NAME, "Current local time in major cities")
    }
}

#[async_trait]
impl Agent for ClockAgent {
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope {
        let city = match string_argument(&arguments, &["city"]) {
            Some(requested) => match find_city(requested) {
                Some(city) => Some(city),
                None => return ResponseEnvelope::error(format!("unknown city: {requested}")),
            },
            None => string_argument(&arguments, &["query"])
                .and_then(find_city)
                .or_else(|| find_city(DEFAULT_CITY)),
        };
        let Some((name, offset_hours)) = city else {
            return ResponseEnvelope::error("no city available");
        };

        let Some(offset) = FixedOffset::east_opt(offset_hours * 3600) else {
            return ResponseEnvelope::error(format!("invalid UTC offset for {name}"));
        };
        let now: DateTime<FixedOffset> = Utc::now().with_timezone(&offset);
        let time = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let utc_offset = now.format("%:z").to_string();

        let mut data = Map::new();
        data.insert("city".to_string(), Value::from(name));
        data.insert("time".to_string(), Value::from(time.clone()));
        data.insert("utc_offset".to_string(), Value::from(utc_offset.clone()));
        ResponseEnvelope::success(format!("Current time in {name}: {time} (UTC{utc_offset})"))
            .with_data(data)
    }
}

/// First known city mentioned anywhere in `text`.
fn find_city(text: &str) -> Option<(&'static str, i32)> {
    let text = text.to_lowercase();
    CITIES
        .iter()
        .find(|(_, aliases, _)| aliases.iter().any(|alias| text.contains(alias)))
        .map(|(name, _, offset)| (*name, *offset))
}
