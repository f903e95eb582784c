//! Stage 5: v2-compat — collapse the double-nested `properties.properties`
//! payload some older client libraries still emit, when `config.v2_compat`
//! is set (`spec.md` §6 `v2_compat`, §9 notes on legacy payload quirks).

use ingest_core::record::RecordShape;
use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    if !state.config.v2_compat || state.config.record_type.shape() != RecordShape::Event {
        return StageOutcome::Keep(record);
    }
    let Some(Value::Object(properties)) = record.get_mut("properties") else {
        return StageOutcome::Keep(record);
    };
    if let Some(Value::Object(inner)) = properties.remove("properties") {
        for (key, value) in inner {
            properties.entry(key).or_insert(value);
        }
    }
    StageOutcome::Keep(record)
}
