//! Amplitude export event mapping. Amplitude's export/S3 event JSON uses
//! `user_id`/`device_id`, millisecond `time`, and separate
//! `event_properties`/`user_properties` bags.

use ingest_core::Record;
use serde_json::{Map, Value};

use crate::adapter::VendorAdapter;
use crate::common::{millis_to_seconds, resolve_identity};

pub struct AmplitudeAdapter;

impl VendorAdapter for AmplitudeAdapter {
    fn name(&self) -> &'static str {
        "amplitude"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        let obj = raw.as_object()?;
        let event_name = obj.get("event_type")?.as_str()?;

        let user_id = obj.get("user_id").and_then(|v| v.as_str());
        let device_id = obj.get("device_id").and_then(|v| v.as_str());
        let distinct_id = resolve_identity(&[user_id, device_id])?;

        let time_ms = obj.get("time").and_then(|v| v.as_i64())?;

        let mut properties = Map::new();
        properties.insert("distinct_id".to_string(), Value::String(distinct_id.to_string()));
        properties.insert("time".to_string(), Value::from(millis_to_seconds(time_ms)));
        if let Some(id) = obj.get("insert_id").and_then(|v| v.as_str()) {
            properties.insert("$insert_id".to_string(), Value::String(id.to_string()));
        }
        if let Some(Value::Object(event_props)) = obj.get("event_properties") {
            for (k, v) in event_props {
                properties.insert(k.clone(), v.clone());
            }
        }
        if let Some(Value::Object(user_props)) = obj.get("user_properties") {
            for (k, v) in user_props {
                properties.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

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
    fn maps_a_basic_amplitude_event() {
        let raw = json!({
            "event_type": "Button Clicked",
            "user_id": "u1",
            "time": 1_700_000_000_000i64,
            "event_properties": {"button": "signup"},
            "insert_id": "amp-abc"
        });
        let record = AmplitudeAdapter.map_event(&raw).unwrap();
        assert_eq!(record["event"], json!("Button Clicked"));
        assert_eq!(record["properties"]["distinct_id"], json!("u1"));
        assert_eq!(record["properties"]["time"], json!(1_700_000_000i64));
        assert_eq!(record["properties"]["button"], json!("signup"));
        assert_eq!(record["properties"]["$insert_id"], json!("amp-abc"));
    }

    #[test]
    fn falls_back_to_device_id_when_user_id_missing() {
        let raw = json!({
            "event_type": "App Opened",
            "device_id": "dev-1",
            "time": 1_700_000_000_000i64
        });
        let record = AmplitudeAdapter.map_event(&raw).unwrap();
        assert_eq!(record["properties"]["distinct_id"], json!("dev-1"));
    }

    #[test]
    fn no_usable_identity_yields_none() {
        let raw = json!({"event_type": "App Opened", "user_id": "null", "time": 1});
        assert!(AmplitudeAdapter.map_event(&raw).is_none());
    }
}
