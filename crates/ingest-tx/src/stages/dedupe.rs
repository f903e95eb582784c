//! Stage 4: dedupe — applied immediately after shape normalization
//! (`spec.md` §4.3 design note: "applied after vendor mapping and shape
//! normalization"). Vendor mapping happens upstream of this crate, so
//! "after shape normalization" puts this right after stage 3.
//!
//! This fills the gap the canonical stage numbering leaves at 4 — the
//! upstream numbering treats dedupe as a cross-cutting concern rather than
//! a togglable item in the enumerated list, but it still has exactly one
//! well-defined position in the chain.
//!
//! The dedupe key is the joined values of `insert_id_tuple` when
//! configured, else the stable hash of the record's canonical form
//! (`spec.md` §4.3 concrete scenario #7).

use ingest_core::hash::stable_hash_hex;
use ingest_core::{JobState, Record};
use serde_json::Value;

use crate::outcome::{DropReason, StageOutcome};
use crate::util::property_bag;

pub fn apply(state: &JobState, record: Record) -> StageOutcome {
    if !state.config.dedupe {
        return StageOutcome::Keep(record);
    }
    let key = dedupe_key(state, &record);
    let mut set = state.dedupe_set.lock();
    if !set.insert(key) {
        return StageOutcome::Drop(DropReason::Duplicate);
    }
    drop(set);
    StageOutcome::Keep(record)
}

fn dedupe_key(state: &JobState, record: &Record) -> String {
    if state.config.insert_id_tuple.is_empty() {
        return stable_hash_hex(&Value::Object(record.clone()));
    }
    let shape = state.config.record_type.shape();
    let bag = property_bag(record, shape);
    state
        .config
        .insert_id_tuple
        .iter()
        .map(|field| {
            bag.get(field)
                .or_else(|| record.get(field))
                .map(|v| v.to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\u{1f}")
}
