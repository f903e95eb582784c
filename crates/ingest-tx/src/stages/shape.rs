//! Stage 3: shape-fix — normalize loosely-formed input into the shape the
//! target endpoint expects (`spec.md` §3/§4.3, REDESIGN FLAGS on permissive
//! input handling).
//!
//! `Event` records gain a `"properties"` object (stray top-level keys other
//! than `"event"` are folded into it, whether or not a `"properties"`
//! object already exists — some source exports emit flat event records
//! with no nesting at all, others emit a partial `properties` object
//! alongside leftover top-level fields); a non-numeric `properties.time`
//! is re-parsed as an RFC 3339 timestamp into unix milliseconds, and
//! `user_id`/`device_id`/`source` are renamed to their `$`-prefixed
//! reserved-property form. If `$insert_id` is still absent once the
//! `(event, distinct_id, time)` tuple can be fully assembled, it's
//! synthesized here as a stable hash of that tuple — the default scheme
//! stage 15 (`insert_id.rs`) otherwise falls back to when this stage
//! couldn't assemble it. `Profile`/`Group` records gain a `"$token"`
//! placeholder key if wholly absent (filled from config later by the
//! token-add stage) and are otherwise left alone, since a profile
//! update's directive nesting is caller-supplied and not ours to guess.
//! `LookupRow`/`ScdRow`/`ExportRow` pass through unchanged.

use chrono::DateTime;
use ingest_core::record::RecordShape;
use ingest_core::{JobState, Record};
use serde_json::{Map, Value};

use crate::outcome::{DropReason, StageOutcome};
use crate::util::{hash_join, scalar_join_part};

const RENAMED_KEYS: &[(&str, &str)] = &[
    ("user_id", "$user_id"),
    ("device_id", "$device_id"),
    ("source", "$source"),
];

pub fn apply(state: &JobState, record: Record) -> StageOutcome {
    match state.config.record_type.shape() {
        RecordShape::Event => fix_event(record),
        RecordShape::Profile => fix_profile(record),
        RecordShape::LookupRow | RecordShape::ScdRow | RecordShape::ExportRow => {
            StageOutcome::Keep(record)
        }
    }
}

fn fix_event(mut record: Record) -> StageOutcome {
    if !record.contains_key("event") {
        return StageOutcome::Drop(DropReason::Unparsable);
    }
    let event_name = record.remove("event");
    let mut properties = match record.remove("properties") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    // Any other top-level field is a stray key that never got nested —
    // fold it in regardless of whether `properties` already existed.
    // Existing `properties` entries win on collision since they're
    // already in their normalized home.
    for (key, value) in record.into_iter() {
        properties.entry(key).or_insert(value);
    }

    let Some(event_name) = event_name else {
        return StageOutcome::Drop(DropReason::Unparsable);
    };
    normalize_properties(&mut properties);
    synthesize_default_insert_id(&event_name, &mut properties);

    let mut fixed = Map::new();
    fixed.insert("event".to_string(), event_name);
    fixed.insert("properties".to_string(), Value::Object(properties));
    StageOutcome::Keep(fixed)
}

/// Synthesizes `$insert_id` from the default `(event, distinct_id, time)`
/// tuple when it's still absent and every member of that tuple is present.
/// Left unset otherwise — `insert_id.rs` (stage 15) gets another chance at
/// it, ultimately falling back to a whole-record hash (`spec.md` §4.3 items
/// 3/15, §8 scenario 1).
fn synthesize_default_insert_id(event_name: &Value, properties: &mut Map<String, Value>) {
    if properties.contains_key("$insert_id") {
        return;
    }
    let Some(distinct_id) = properties.get("distinct_id") else {
        return;
    };
    let Some(time) = properties.get("time") else {
        return;
    };
    let joined = format!(
        "{}-{}-{}",
        scalar_join_part(event_name),
        scalar_join_part(distinct_id),
        scalar_join_part(time)
    );
    properties.insert("$insert_id".to_string(), Value::String(hash_join(&joined)));
}

/// Renames reserved identity keys to their `$`-prefixed form and coerces a
/// string-valued `time` into unix milliseconds. Leaves `time` untouched if
/// it isn't a recognized RFC 3339 timestamp — a later stage or the remote
/// API is left to reject it.
fn normalize_properties(properties: &mut Map<String, Value>) {
    for (from, to) in RENAMED_KEYS {
        if properties.contains_key(*to) {
            continue;
        }
        if let Some(value) = properties.remove(*from) {
            properties.insert(to.to_string(), value);
        }
    }

    if let Some(Value::String(raw)) = properties.get("time") {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            properties.insert("time".to_string(), Value::from(parsed.timestamp_millis()));
        }
    }
}

fn fix_profile(mut record: Record) -> StageOutcome {
    if record.is_empty() {
        return StageOutcome::Drop(DropReason::Empty);
    }
    if !record.contains_key("$token") {
        record.insert("$token".to_string(), Value::Null);
    }
    StageOutcome::Keep(record)
}
