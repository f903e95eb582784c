//! Stage 12: column-drop — remove `config.drop_columns` keys from the
//! whole record, not just the property bag (`spec.md` §6 `drop_columns`).
//! Used mainly for lookup-table rows and export passthrough, where columns
//! live at the top level rather than nested under `properties`.

use ingest_core::{JobState, Record};

use crate::outcome::StageOutcome;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    for key in &state.config.drop_columns {
        record.remove(key);
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
    fn drops_named_top_level_columns() {
        let mut cfg = crate::tests_support::config_for(RecordKind::Table);
        cfg.drop_columns = vec!["internal_note".to_string()];
        let state = JobState::new(cfg).unwrap();
        let record: Record =
            serde_json::from_value(json!({"id": "1", "internal_note": "scratch"})).unwrap();
        match apply(&state, record) {
            StageOutcome::Keep(r) => assert!(r.get("internal_note").is_none()),
            _ => panic!("expected keep"),
        }
    }
}
