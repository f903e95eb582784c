//! Stage 9: allow/deny-list — event name, property key, property value,
//! and key+value composite filters (`spec.md` §4.3, §6 `filters`).
//!
//! A whitelist, when non-empty, is exclusive: anything not listed is
//! dropped. A blacklist is always exclusionary. Blacklists are checked
//! first, matching the glossary's implied precedence (deny wins).

use ingest_core::record::RecordShape;
use ingest_core::{JobState, Record};

use crate::outcome::{DropReason, StageOutcome};
use crate::util::property_bag;

pub fn apply(state: &JobState, record: Record) -> StageOutcome {
    let filters = &state.config.filters;
    let shape = state.config.record_type.shape();

    if shape == RecordShape::Event {
        if let Some(event) = record.get("event").and_then(|v| v.as_str()) {
            if filters.event_blacklist.iter().any(|e| e == event) {
                return StageOutcome::Drop(DropReason::BlacklistSkipped);
            }
            if !filters.event_whitelist.is_empty() && !filters.event_whitelist.iter().any(|e| e == event) {
                return StageOutcome::Drop(DropReason::WhitelistSkipped);
            }
        }
    }

    let bag = property_bag(&record, shape);

    for key in bag.keys() {
        if filters.prop_key_blacklist.iter().any(|k| k == key) {
            return StageOutcome::Drop(DropReason::BlacklistSkipped);
        }
    }
    if !filters.prop_key_whitelist.is_empty() {
        let has_allowed_key = bag
            .keys()
            .any(|k| filters.prop_key_whitelist.iter().any(|allowed| allowed == k));
        if !has_allowed_key {
            return StageOutcome::Drop(DropReason::WhitelistSkipped);
        }
    }

    for value in bag.values() {
        if let Some(s) = value.as_str() {
            if filters.prop_val_blacklist.iter().any(|v| v == s) {
                return StageOutcome::Drop(DropReason::BlacklistSkipped);
            }
        }
    }
    if !filters.prop_val_whitelist.is_empty() {
        let has_allowed_value = bag.values().any(|v| {
            v.as_str()
                .map(|s| filters.prop_val_whitelist.iter().any(|allowed| allowed == s))
                .unwrap_or(false)
        });
        if !has_allowed_value {
            return StageOutcome::Drop(DropReason::WhitelistSkipped);
        }
    }

    for (key, value) in &filters.combo_blacklist {
        if bag.get(key).and_then(|v| v.as_str()) == Some(value.as_str()) {
            return StageOutcome::Drop(DropReason::BlacklistSkipped);
        }
    }
    if !filters.combo_whitelist.is_empty() {
        let matches_any = filters
            .combo_whitelist
            .iter()
            .any(|(key, value)| bag.get(key).and_then(|v| v.as_str()) == Some(value.as_str()));
        if !matches_any {
            return StageOutcome::Drop(DropReason::WhitelistSkipped);
        }
    }

    StageOutcome::Keep(record)
}
