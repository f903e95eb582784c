//! Stage 14: json-fix — re-parse property values that are themselves
//! JSON-encoded strings back into structured values, when
//! `config.fix_json` is set (`spec.md` §6 `fix_json`). Several source
//! systems double-encode nested objects as strings; this undoes that one
//! level deep, leaving already-structured values untouched.

use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.fix_json {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    for value in bag.values_mut() {
        if let Value::String(s) = value {
            let trimmed = s.trim();
            let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with('[');
            if looks_like_json {
                if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                    *value = parsed;
                }
            }
        }
    }
    StageOutcome::Keep(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use ingest_core::JobState;
    use serde_json::json;

    fn state() -> std::sync::Arc<JobState> {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.fix_json = true;
        JobState::new(cfg).unwrap()
    }

    #[test]
    fn reparses_json_encoded_string_property() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"metadata": "{\"plan\":\"pro\"}"}
        }))
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["metadata"]["plan"], json!("pro")),
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn leaves_plain_strings_untouched() {
        let st = state();
        let record: Record = serde_json::from_value(json!({
            "event": "click",
            "properties": {"plan": "pro"}
        }))
        .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["plan"], json!("pro")),
            _ => panic!("expected keep"),
        }
    }
}
