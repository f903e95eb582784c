//! Stage 16: token-add — inject `config.token` into the event's `token`
//! property when `config.add_token` is set and a token is configured
//! (`spec.md` §6 `add_token`). A no-op when no token is available; missing
//! auth is handled separately by `JobState::resolve_auth`.

use ingest_core::record::RecordShape;
use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;
use crate::util::property_bag_mut;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.add_token || state.config.record_type.shape() != RecordShape::Event {
        return StageOutcome::Keep(record);
    }
    let Some(token) = state.config.token.clone() else {
        return StageOutcome::Keep(record);
    };
    let shape = state.config.record_type.shape();
    let bag = property_bag_mut(&mut record, shape);
    bag.entry("token").or_insert(Value::String(token));
    StageOutcome::Keep(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::record::RecordKind;
    use ingest_core::JobState;
    use serde_json::json;

    #[test]
    fn adds_token_when_configured() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.add_token = true;
        cfg.token = Some("abc123".to_string());
        let state = JobState::new(cfg).unwrap();
        let record: Record = serde_json::from_value(json!({"event": "click", "properties": {}})).unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert_eq!(r["properties"]["token"], json!("abc123")),
            _ => panic!("expected keep"),
        }
    }

    #[test]
    fn no_token_configured_is_a_no_op() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Event);
        cfg.add_token = true;
        let state = JobState::new(cfg).unwrap();
        let record: Record = serde_json::from_value(json!({"event": "click", "properties": {}})).unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert!(r["properties"].get("token").is_none()),
            _ => panic!("expected keep"),
        }
    }
}
