//! Stage 7: utc-offset — shift the record's `time` field by
//! `config.time_offset` seconds (`spec.md` §6 `time_offset`). Distinct from
//! the later time-transform stage, which normalizes units rather than
//! applying a caller-supplied shift.

use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if state.config.time_offset == 0 {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    if let Some(Value::Number(n)) = bag.get("time") {
        if let Some(t) = n.as_i64() {
            bag.insert(
                "time".to_string(),
                Value::Number((t + state.config.time_offset).into()),
            );
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

    #[test]
    fn shifts_time_by_offset() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.time_offset = 3600;
        let state = JobState::new(cfg).unwrap();
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"time": 1000}}))
                .unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["time"], json!(4600)),
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn zero_offset_is_a_no_op() {
        let cfg = crate::tests_support::config_for(RecordKind::Event);
        let state = JobState::new(cfg).unwrap();
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"time": 1000}}))
                .unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["time"], json!(1000)),
            _ => panic!("expected keep"),
        }
    }
}
