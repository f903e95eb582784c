//! Stage 6: null-remove — recursively drop null-valued keys when
//! `config.remove_nulls` is set (`spec.md` §4.3 testable property:
//! idempotent — `remove_nulls(remove_nulls(x)) == remove_nulls(x)`).

use ingest_core::{JobState, Record};
use serde_json::{Map, Value};

use crate::outcome::StageOutcome;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.remove_nulls {
        return StageOutcome::Keep(record);
    }
    strip_nulls_map(&mut record);
    StageOutcome::Keep(record)
}

fn strip_nulls_map(map: &mut Map<String, Value>) {
    map.retain(|_, v| !v.is_null());
    for value in map.values_mut() {
        strip_nulls_value(value);
    }
}

fn strip_nulls_value(value: &mut Value) {
    match value {
        Value::Object(inner) => strip_nulls_map(inner),
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_nulls_value(item);
            }
        }
        _ => {}
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
        cfg.remove_nulls = true;
        JobState::new(cfg).unwrap()
    }

    #[test]
    fn removes_nested_nulls() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"a": 1, "b": null, "nested": {"c": null, "d": 2}}
        }))
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => {
                assert!(r["properties"].get("b").is_none());
                assert!(r["properties"]["nested"].get("c").is_none());
                assert_eq!(r["properties"]["nested"]["d"], json!(2));
            }
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn is_idempotent() {
        let st = state();
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"a": null, "b": 1}}))
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
}
