//! Heap export event mapping. Heap's event export uses `identity`
//! (resolved identity) falling back to `user_id` (Heap's internal device
//! id), a top-level `event` name, millisecond `time`, and a flat
//! `properties` bag (already close to Mixpanel's shape).

use ingest_core::Record;
use serde_json::{Map, Value};

use crate::adapter::VendorAdapter;
use crate::common::{millis_to_seconds, resolve_identity};

pub struct HeapAdapter;

impl VendorAdapter for HeapAdapter {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        let obj = raw.as_object()?;
        let event_name = obj.get("event")?.as_str()?;

        let identity = obj.get("identity").and_then(|v| v.as_str());
        let user_id = obj.get("user_id").and_then(|v| v.as_str());
        let distinct_id = resolve_identity(&[identity, user_id])?;

        let time_ms = obj.get("time").and_then(|v| v.as_i64())?;

        let mut properties = match obj.get("properties") {
            Some(Value::Object(props)) => props.clone(),
            _ => Map::new(),
        };
        properties.insert("distinct_id".to_string(), Value::String(distinct_id.to_string()));
        properties.insert("time".to_string(), Value::from(millis_to_seconds(time_ms)));

        let mut record = Map::new();
        record.insert("event".to_string(), Value::String(event_name.to_string()));
        record.insert("properties".to_string(), Value::Object(properties));
        Some(record)
    }
}
