//! Shared helpers for reading/writing the "property bag" of a record,
//! whose location depends on the run's `RecordShape` (`spec.md` §3).

use ingest_core::record::RecordShape;
use ingest_core::Record;
use serde_json::{Map, Value};

/// For `Event` shape, properties live under the `"properties"` key; every
/// other shape treats the record itself as the flat bag. Creates the
/// `"properties"` object if it is missing or of the wrong type, so stages
/// never have to handle an absent bag.
pub fn property_bag_mut<'a>(record: &'a mut Record, shape: RecordShape) -> &'a mut Map<String, Value> {
    match shape {
        RecordShape::Event => {
            if !matches!(record.get("properties"), Some(Value::Object(_))) {
                record.insert("properties".to_string(), Value::Object(Map::new()));
            }
            record
                .get_mut("properties")
                .and_then(|v| v.as_object_mut())
                .expect("just inserted as object")
        }
        _ => record,
    }
}

pub fn property_bag<'a>(record: &'a Record, shape: RecordShape) -> &'a Map<String, Value> {
    match shape {
        RecordShape::Event => record
            .get("properties")
            .and_then(|v| v.as_object())
            .unwrap_or_else(|| EMPTY_MAP.get_or_init(Map::new)),
        _ => record,
    }
}

static EMPTY_MAP: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

/// Renders a scalar the way a tuple join expects: a string's literal
/// contents, not `Value`'s quoted JSON form (`Value::String("u1").to_string()`
/// is the four characters `"u1"`, quotes included — wrong for building a
/// human-joined key like `click-u1-100`).
pub fn scalar_join_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// FNV-1a hash of the raw joined tuple string. Deliberately bypasses
/// `stable_hash_hex`'s JSON canonicalization (which would re-quote string
/// tuple members) since the input here is already a plain joined string,
/// not a `Value` to canonicalize.
pub fn hash_join(joined: &str) -> String {
    format!("{:08x}", ingest_core::hash::fnv1a32(joined.as_bytes()))
}
