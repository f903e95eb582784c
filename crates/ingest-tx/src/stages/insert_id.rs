//! Stage 15: insert-id-add — synthesize `$insert_id` for event records so
//! retried/duplicate-sent batches can be deduplicated downstream
//! (`spec.md` §4.3 item 15, §8 scenario 7). Reached only when `shape-fix`
//! (stage 3) didn't already synthesize one from the default
//! `(event, distinct_id, time)` tuple — typically because `distinct_id` or
//! `time` was still missing at that point.
//!
//! Joins `config.insert_id_tuple` field values (top-level or inside
//! `properties`) when configured, hashed; falls back to the same default
//! tuple `shape-fix` uses when no tuple is configured. Either way, a tuple
//! that can't be fully assembled falls back further to the stable hash of
//! the whole record. A no-op for anything but event-shaped records, and a
//! no-op if `$insert_id` is already present.

use ingest_core::hash::stable_hash_hex;
use ingest_core::record::RecordShape;
use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::StageOutcome;
use crate::util::{hash_join, property_bag, property_bag_mut, scalar_join_part};

const DEFAULT_TUPLE: [&str; 3] = ["event", "distinct_id", "time"];

pub fn apply(state: &JobState, mut record: Record) -> StageOutcome {
    let shape = state.config.record_type.shape();
    if shape != RecordShape::Event {
        return StageOutcome::Keep(record);
    }
    if property_bag_mut(&mut record, shape).contains_key("$insert_id") {
        return StageOutcome::Keep(record);
    }

    let insert_id = if state.config.insert_id_tuple.is_empty() {
        tuple_join(DEFAULT_TUPLE.iter().copied(), &record, shape)
    } else {
        tuple_join(
            state.config.insert_id_tuple.iter().map(String::as_str),
            &record,
            shape,
        )
    }
    .unwrap_or_else(|| stable_hash_hex(&Value::Object(record.clone())));

    property_bag_mut(&mut record, shape)
        .insert("$insert_id".to_string(), Value::String(insert_id));
    StageOutcome::Keep(record)
}

/// Joins `fields`' values with `-` and hashes the join. Each field is
/// looked up in the property bag first, falling back to the record's top
/// level — `event` (and any caller-configured field) can live at either
/// level. `None` if any field is missing: the tuple can't be fully
/// assembled, and the caller falls back to a whole-record hash.
fn tuple_join<'a>(
    fields: impl Iterator<Item = &'a str>,
    record: &Record,
    shape: RecordShape,
) -> Option<String> {
    let bag = property_bag(record, shape);
    let mut parts = Vec::new();
    for field in fields {
        let value = bag.get(field).or_else(|| record.get(field))?;
        parts.push(scalar_join_part(value));
    }
    Some(hash_join(&parts.join("-")))
}
