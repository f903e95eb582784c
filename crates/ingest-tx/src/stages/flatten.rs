//! Stage 13: flatten — collapse nested objects in the property bag into
//! dot-joined top-level keys when `config.flatten_data` is set (`spec.md`
//! §4.3 testable property: idempotent —
//! `flatten(flatten(x)) == flatten(x)`). Arrays are left as-is; flattening
//! them would lose their positional meaning.

use ingest_core::{JobState, Record};
use serde_json::{Map, Value};

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.flatten_data {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    let flattened = flatten_map(std::mem::take(bag));
    *bag = flattened;
    StageOutcome::Keep(record)
}

fn flatten_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        flatten_into(&key, value, &mut out);
    }
    out
}

fn flatten_into(prefix: &str, value: Value, out: &mut Map<String, Value>) {
    match value {
        Value::Object(inner) => {
            for (key, nested) in inner {
                flatten_into(&format!("{prefix}.{key}"), nested, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use ingest_core::JobState;
    use serde_json::json;

    fn state() -> std::sync::Arc<JobState> {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.flatten_data = true;
        JobState::new(cfg).unwrap()
    }

    #[test]
    fn flattens_nested_objects_to_dotted_keys() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"address": {"city": "nyc", "zip": "10001"}, "plan": "pro"}
        }))
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => {
                assert_eq!(r["properties"]["address.city"], json!("nyc"));
                assert_eq!(r["properties"]["address.zip"], json!("10001"));
                assert_eq!(r["properties"]["plan"], json!("pro"));
                assert!(r["properties"].get("address").is_none());
            }
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn is_idempotent() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"a": {"b": {"c": 1}}}
        }))
        .unwrap();
        let once = match apply(&st, record) {
            StageOutcome::Keep(r) => r,
            _ => panic!("expected keep"),
        };
        let twice = match apply(&st, once.clone()) {
            StageOutcome::Keep(r) => r,
            _ => panic!("expected keep"),
        };
        assert_eq!(once, twice);
    }

    #[test]
    fn arrays_are_left_untouched() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"tags": ["a", "b"]}
        }))
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["tags"], json!(["a", "b"])),
            _ => panic!("expected keep"),
        }
    }
}
