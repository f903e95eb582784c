//! PostHog event mapping. PostHog's export shape is already close to
//! Mixpanel's: `distinct_id` at the top level, an `event` name, a flat
//! `properties` bag, and an ISO-8601 `timestamp` rather than an epoch
//! number.

use chrono::DateTime;
use ingest_core::Record;
use serde_json::{Map, Value};

use crate::adapter::VendorAdapter;
use crate::common::resolve_identity;

pub struct PosthogAdapter;

impl VendorAdapter for PosthogAdapter {
    fn name(&self) -> &'static str {
        "posthog"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        let obj = raw.as_object()?;
        let event_name = obj.get("event")?.as_str()?;

        let distinct_id = obj.get("distinct_id").and_then(|v| v.as_str());
        let distinct_id = resolve_identity(&[distinct_id])?;

        let time_secs = match obj.get("timestamp") {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s).ok()?.timestamp(),
            Some(Value::Number(n)) => n.as_i64()?,
            _ => return None,
        };

        let mut properties = match obj.get("properties") {
            Some(Value::Object(props)) => props.clone(),
            _ => Map::new(),
        };
        properties.insert("distinct_id".to_string(), Value::String(distinct_id.to_string()));
        properties.insert("time".to_string(), Value::from(time_secs));

        let mut record = Map::new();
        record.insert("event".to_string(), Value::String(event_name.to_string()));
        record.insert("properties".to_string(), Value::Object(properties));
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_basic_posthog_event() {
        let raw = json!({
            "event": "$pageview",
            "distinct_id": "u1",
            "timestamp": "2023-11-14T22:13:20Z",
            "properties": {"$current_url": "https://example.com"}
        });
        let record = PosthogAdapter.map_event(&raw).unwrap();
        assert_eq!(record["event"], json!("$pageview"));
        assert_eq!(record["properties"]["distinct_id"], json!("u1"));
        assert_eq!(record["properties"]["time"], json!(1_700_000_000i64));
        assert_eq!(record["properties"]["$current_url"], json!("https://example.com"));
    }

    #[test]
    fn numeric_timestamp_is_accepted_directly() {
        let raw = json!({"event": "ping", "distinct_id": "u1", "timestamp": 1_700_000_000i64});
        let record = PosthogAdapter.map_event(&raw).unwrap();
        assert_eq!(record["properties"]["time"], json!(1_700_000_000i64));
    }
}
