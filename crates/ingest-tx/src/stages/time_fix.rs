//! Stage 17: time-transform — normalize `time`'s units, rather than shift
//! it (that's `utc_offset`). Milliseconds- and microseconds-resolution
//! timestamps are common in exported data; Mixpanel's import APIs expect
//! whole seconds, so this rescales anything that looks like it is in a
//! finer unit (`spec.md` §6 `fix_time`, default on).

use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

const MICROSECOND_THRESHOLD: i64 = 10_000_000_000_000;
const MILLISECOND_THRESHOLD: i64 = 10_000_000_000;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.fix_time {
        return StageOutcome::Keep(record);
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    if let Some(Value::Number(n)) = bag.get("time") {
        if let Some(t) = n.as_i64() {
            let fixed = if t >= MICROSECOND_THRESHOLD {
                t / 1_000_000
            } else if t >= MILLISECOND_THRESHOLD {
                t / 1_000
            } else {
                t
            };
            if fixed != t {
                bag.insert("time".to_string(), Value::Number(fixed.into()));
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
        let cfg = crate::tests_support::config_for(RecordKind::Event);
        JobState::new(cfg).unwrap()
    }

    #[test]
    fn rescales_millisecond_timestamps() {
        let st = state();
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"time": 1_700_000_000_000i64}}))
                .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["time"], json!(1_700_000_000i64)),
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn leaves_second_resolution_untouched() {
        let st = state();
        let record: Record =
            serde_json::from_value(json!({"event": "click", "properties": {"time": 1_700_000_000i64}}))
                .unwrap();
        match apply(&st, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["time"], json!(1_700_000_000i64)),
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn disabled_by_fix_time_false() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.fix_time = false;
        let state = JobState::new(cfg).unwrap();
        let record: Record = serde_json::from_value(
            json!({"event": "click", "properties": {"time": 1_700_000_000_000i64}}),
        )
        .unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["time"], json!(1_700_000_000_000i64)),
            _ => panic!("expected keep"),
        }
    }
}
