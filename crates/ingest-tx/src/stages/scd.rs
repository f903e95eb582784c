//! Stage 2: scd-transform — rewrite a slowly-changing-dimension row into
//! the event shape it is actually sent as (`spec.md` §4.3, §6 glossary
//! "SCD"). A no-op for every other record kind.
//!
//! The SCD endpoint is the same as the event-import endpoint
//! (`ingest_core::endpoint`), so an SCD row has to arrive on the wire
//! looking like an event: `{"event": "$scd_update", "properties": {...}}`
//! with the changed dimension's key/value merged in alongside
//! `distinct_id`/`time`.

use ingest_core::record::RecordKind;
use ingest_core::{JobState, Record};
use serde_json::{Map, Value};

use crate::outcome::StageOutcome;

const SCD_EVENT_NAME: &str = "$scd_update";

pub fn apply(state: &JobState, record: Record) -> StageOutcome {
    if state.config.record_type != RecordKind::Scd {
        return StageOutcome::Keep(record);
    }
    if record.contains_key("event") {
        // Already event-shaped (e.g. replayed from a prior run); leave alone.
        return StageOutcome::Keep(record);
    }
    let mut properties = Map::new();
    for (key, value) in record.into_iter() {
        properties.insert(key, value);
    }
    let mut wrapped = Map::new();
    wrapped.insert("event".to_string(), Value::String(SCD_EVENT_NAME.to_string()));
    wrapped.insert("properties".to_string(), Value::Object(properties));
    StageOutcome::Keep(wrapped)
}
