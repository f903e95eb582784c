//! mParticle event mapping. mParticle nests the actual event under
//! `data`, keeps identities in a separate `user_identities` object keyed
//! by identity type, and uses millisecond `timestamp_unixtime_ms`.

use ingest_core::Record;
use serde_json::{Map, Value};

use crate::adapter::VendorAdapter;
use crate::common::{millis_to_seconds, resolve_identity};

pub struct MparticleAdapter;

impl VendorAdapter for MparticleAdapter {
    fn name(&self) -> &'static str {
        "mparticle"
    }

    fn map_event(&self, raw: &Value) -> Option<Record> {
        let obj = raw.as_object()?;
        let data = obj.get("data")?.as_object()?;
        let event_name = data.get("event_name")?.as_str()?;

        let identities = obj.get("user_identities").and_then(|v| v.as_object());
        let customer_id = identities
            .and_then(|m| m.get("customerid"))
            .and_then(|v| v.as_str());
        let email = identities.and_then(|m| m.get("email")).and_then(|v| v.as_str());
        let device_id = obj.get("mpid").and_then(|v| v.as_str());
        let distinct_id = resolve_identity(&[customer_id, email, device_id])?;

        let time_ms = data.get("timestamp_unixtime_ms").and_then(|v| v.as_i64())?;

        let mut properties = match data.get("custom_attributes") {
            Some(Value::Object(attrs)) => attrs.clone(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_basic_mparticle_event() {
        let raw = json!({
            "user_identities": {"customerid": "cust-1"},
            "mpid": "mp-device-5",
            "data": {
                "event_name": "add_to_cart",
                "timestamp_unixtime_ms": 1_700_000_000_000i64,
                "custom_attributes": {"sku": "abc"}
            }
        });
        let record = MparticleAdapter.map_event(&raw).unwrap();
        assert_eq!(record["event"], json!("add_to_cart"));
        assert_eq!(record["properties"]["distinct_id"], json!("cust-1"));
        assert_eq!(record["properties"]["sku"], json!("abc"));
    }

    #[test]
    fn falls_back_to_mpid_when_no_user_identities() {
        let raw = json!({
            "mpid": "mp-device-5",
            "data": {"event_name": "app_open", "timestamp_unixtime_ms": 1i64}
        });
        let record = MparticleAdapter.map_event(&raw).unwrap();
        assert_eq!(record["properties"]["distinct_id"], json!("mp-device-5"));
    }
}
