//! Stage 8: tag-add — merge `config.tags` into the record's property bag,
//! overwriting any existing keys of the same name (`spec.md` §6 `tags`:
//! operator-supplied metadata takes precedence over source data).

use ingest_core::{JobState, Record};

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if state.config.tags.is_empty() {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    for (key, value) in &state.config.tags {
        bag.insert(key.clone(), value.clone());
    }
    StageOutcome::Keep(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use ingest_core::JobState;
    use serde_json::json;

    #[test]
    fn tags_overwrite_existing_keys() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.tags.insert("env".to_string(), json!("prod"));
        let state = JobState::new(cfg).unwrap();
        let record: Record = serde_json::from_value(
            json!({"event": "click", "properties": {"env": "staging"}}),
        )
        .unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["env"], json!("prod")),
            _ => panic!("expected keep"),
        }
    }
}
