//! GA4 (BigQuery) export event mapping. GA4's export shape nests
//! everything: `user_pseudo_id` is the only always-present identity,
//! `event_timestamp` is microseconds, and event properties are an array of
//! `{key, value: {string_value|int_value|float_value|double_value}}`
//! pairs rather than a flat object.

use ingest_core::Record;
use serde_json::{Map, Value};

use crate::adapter::VendorAdapter;
use crate::common::{micros_to_seconds, resolve_identity};

pub struct Ga4Adapter;

impl VendorAdapter for Ga4Adapter {
    fn name(&self) -> &'static str {
        "ga4"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        let obj = raw.as_object()?;
        let event_name = obj.get("event_name")?.as_str()?;

        let user_id = obj.get("user_id").and_then(|v| v.as_str());
        let pseudo_id = obj.get("user_pseudo_id").and_then(|v| v.as_str());
        let distinct_id = resolve_identity(&[user_id, pseudo_id])?;

        let time_micros = obj.get("event_timestamp").and_then(|v| v.as_i64())?;

        let mut properties = Map::new();
        properties.insert("distinct_id".to_string(), Value::String(distinct_id.to_string()));
        properties.insert("time".to_string(), Value::from(micros_to_seconds(time_micros)));

        if let Some(Value::Array(params)) = obj.get("event_params") {
            for param in params {
                let Some(key) = param.get("key").and_then(|v| v.as_str()) else {
                    continue;
                };
                let Some(value) = param.get("value").and_then(unwrap_typed_value) else {
                    continue;
                };
                properties.insert(key.to_string(), value);
            }
        }

        let mut record = Map::new();
        record.insert("event".to_string(), Value::String(event_name.to_string()));
        record.insert("properties".to_string(), Value::Object(properties));
        Some(record)
    }
}

/// GA4's typed-value wrapper: exactly one of these keys is present.
fn unwrap_typed_value(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    for key in ["string_value", "int_value", "float_value", "double_value"] {
        if let Some(v) = obj.get(key) {
            if !v.is_null() {
                return Some(v.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_basic_ga4_event_with_typed_params() {
        let raw = json!({
            "event_name": "purchase",
            "user_pseudo_id": "pseudo-1",
            "event_timestamp": 1_700_000_000_000_000i64,
            "event_params": [
                {"key": "currency", "value": {"string_value": "usd"}},
                {"key": "value", "value": {"double_value": 19.99}}
            ]
        });
        let record = Ga4Adapter.map_event(&raw).unwrap();
        assert_eq!(record["event"], json!("purchase"));
        assert_eq!(record["properties"]["distinct_id"], json!("pseudo-1"));
        assert_eq!(record["properties"]["time"], json!(1_700_000_000i64));
        assert_eq!(record["properties"]["currency"], json!("usd"));
        assert_eq!(record["properties"]["value"], json!(19.99));
    }

    #[test]
    fn prefers_user_id_over_pseudo_id() {
        let raw = json!({
            "event_name": "login",
            "user_id": "real-user",
            "user_pseudo_id": "pseudo-1",
            "event_timestamp": 1i64
        });
        let record = Ga4Adapter.map_event(&raw).unwrap();
        assert_eq!(record["properties"]["distinct_id"], json!("real-user"));
    }
}
